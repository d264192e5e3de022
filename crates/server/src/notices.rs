//! Notice text assembly.
//!
//! Notice texts are configured with placeholder tokens (`{product_name}`,
//! `{guest_session_in_days}`) that are substituted at render time.

use std::time::Duration;

/// Substitute placeholder tokens in a configured notice text.
#[must_use]
pub fn replace_tokens(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut text = template.to_owned();
    for (token, value) in substitutions {
        text = text.replace(token, value);
    }
    text
}

/// Render a remaining lifetime the way a shopper would say it.
///
/// Rounds to the nearest count of the largest sensible unit: "2 days",
/// "5 hours", "12 mins". Sub-minute remainders are "less than a minute".
#[must_use]
pub fn humanize_duration(duration: Duration) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    let secs = duration.as_secs();
    let (count, unit) = if secs >= DAY {
        ((secs + DAY / 2) / DAY, "day")
    } else if secs >= HOUR {
        ((secs + HOUR / 2) / HOUR, "hour")
    } else if secs >= MINUTE {
        ((secs + MINUTE / 2) / MINUTE, "min")
    } else {
        return "less than a minute".to_owned();
    };

    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_all_tokens() {
        let text = replace_tokens(
            "{product_name} Added to Wishlist",
            &[("{product_name}", "Enamel Mug")],
        );
        assert_eq!(text, "Enamel Mug Added to Wishlist");

        let text = replace_tokens(
            "deleted after {guest_session_in_days}.",
            &[("{guest_session_in_days}", "30 days")],
        );
        assert_eq!(text, "deleted after 30 days.");
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let text = replace_tokens("hello {nobody}", &[("{product_name}", "x")]);
        assert_eq!(text, "hello {nobody}");
    }

    #[test]
    fn humanizes_each_unit() {
        assert_eq!(humanize_duration(Duration::from_secs(30 * 86_400)), "30 days");
        assert_eq!(humanize_duration(Duration::from_secs(86_400)), "1 day");
        assert_eq!(humanize_duration(Duration::from_secs(5 * 3_600)), "5 hours");
        assert_eq!(humanize_duration(Duration::from_secs(12 * 60)), "12 mins");
        assert_eq!(humanize_duration(Duration::from_secs(59)), "less than a minute");
    }

    #[test]
    fn humanize_rounds_to_nearest() {
        // A freshly written 30-day record still reads as 30 days.
        assert_eq!(
            humanize_duration(Duration::from_secs(30 * 86_400 - 5)),
            "30 days"
        );
        assert_eq!(humanize_duration(Duration::from_secs(36 * 3_600)), "2 days");
    }
}
