//! Wishlist route handlers.
//!
//! The wishlist page is server-rendered; mutations arrive as AJAX form posts
//! and return a JSON envelope plus pre-rendered HTML fragments the client
//! swaps into the page. A `?add-to-wishlist=<id>` GET fallback covers
//! non-JS contexts.
//!
//! Input handling is deliberately forgiving: a missing or garbled product ID
//! is absorbed into a success-shaped no-op response. Only a bad nonce is
//! terminal, and that failure is plain text, not JSON.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use wishlist_core::{ProductId, WishlistIdentity};

use crate::config::ButtonAction;
use crate::error::AppError;
use crate::middleware::{ResolveIdentity, nonce};
use crate::models::session_keys;
use crate::notices::{humanize_duration, replace_tokens};
use crate::services::catalog::Product;
use crate::services::wishlist::UpdateAction;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// One wishlist table row, ready for the template.
#[derive(Clone)]
pub struct WishlistRowView {
    pub product_id: i64,
    pub title: String,
    pub slug: String,
    pub price: String,
    pub stock_label: String,
    pub purchasable: bool,
    pub add_to_cart_label: String,
}

impl WishlistRowView {
    fn from_product(product: &Product, state: &AppState) -> Self {
        let texts = &state.config().wishlist.texts;
        Self {
            product_id: product.id.get(),
            title: product.title.clone(),
            slug: product.slug.clone(),
            price: product.display_price(),
            stock_label: if product.in_stock {
                texts.in_stock.clone()
            } else {
                texts.out_of_stock.clone()
            },
            purchasable: product.purchasable,
            add_to_cart_label: texts.add_to_cart_label.clone(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistPageTemplate {
    pub rows: Vec<WishlistRowView>,
    pub nonce: String,
    pub flash: Option<String>,
    pub guest_notice: Option<String>,
    pub empty_text: String,
    pub add_all_label: String,
}

/// Standalone wishlist row fragment (appended by the client after an add).
#[derive(Template)]
#[template(path = "partials/wishlist_row.html")]
struct WishlistRowTemplate {
    row: WishlistRowView,
}

/// Confirmation popup fragment.
#[derive(Template)]
#[template(path = "partials/wishlist_popup.html")]
struct WishlistPopupTemplate {
    message: String,
    wishlist_url: String,
    view_wishlist_text: String,
}

/// Count badge fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/wishlist_count.html")]
pub struct WishlistCountTemplate {
    pub count: usize,
}

/// Removal notice fragment with the undo affordance.
#[derive(Template)]
#[template(path = "partials/remove_notice.html")]
struct RemoveNoticeTemplate {
    product_id: i64,
    undo_label: String,
    message: String,
}

/// Aggregate cart notice fragment.
#[derive(Template)]
#[template(path = "partials/cart_notice.html")]
struct CartNoticeTemplate {
    lines: Vec<String>,
    cart_url: Option<String>,
    view_cart_text: String,
}

// =============================================================================
// Form / Query Types
// =============================================================================

/// Update (toggle/remove) form data.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub product_id: Option<String>,
    pub nonce: Option<String>,
    pub remove_product: Option<String>,
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: Option<String>,
    pub nonce: Option<String>,
    pub cart_all: Option<String>,
}

/// Remove form data.
#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub product_id: Option<String>,
    pub nonce: Option<String>,
}

/// Query-string fallback parameters.
#[derive(Debug, Deserialize)]
pub struct AddFallbackQuery {
    #[serde(rename = "add-to-wishlist")]
    pub add_to_wishlist: Option<String>,
}

// =============================================================================
// Response Payloads
// =============================================================================

/// The JSON envelope every AJAX handler responds with.
#[derive(Debug, Serialize)]
pub struct AjaxSuccess<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> AjaxSuccess<T> {
    fn of(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// Payload for the update handler.
#[derive(Debug, Default, Serialize)]
pub struct UpdateData {
    pub product_id: i64,
    pub show_icon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_in_wishlist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_item: Option<String>,
}

/// Payload for the add-to-cart handler.
#[derive(Debug, Default, Serialize)]
pub struct AddToCartData {
    pub added_to_cart: bool,
    pub add_to_cart_notice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_item: Option<Vec<String>>,
}

/// Payload for the remove handler.
#[derive(Debug, Default, Serialize)]
pub struct RemoveData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_notice: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Truthiness of optional flag parameters (`cart_all`, `remove_product`).
fn flag_is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
    })
}

/// Product title for notices; unknown products get a generic stand-in.
async fn product_title(state: &AppState, product: ProductId) -> Result<String, AppError> {
    Ok(state
        .catalog()
        .product(product)
        .await?
        .map_or_else(|| format!("Product #{product}"), |p| p.title))
}

fn render_popup(state: &AppState, message: String) -> Result<String, AppError> {
    let template = WishlistPopupTemplate {
        message,
        wishlist_url: state.config().wishlist_url(),
        view_wishlist_text: state.config().wishlist.texts.view_wishlist.clone(),
    };
    Ok(template.render()?)
}

async fn render_row(state: &AppState, product: ProductId) -> Result<Option<String>, AppError> {
    let Some(product) = state.catalog().product(product).await? else {
        return Ok(None);
    };
    let template = WishlistRowTemplate {
        row: WishlistRowView::from_product(&product, state),
    };
    Ok(Some(template.render()?))
}

// =============================================================================
// Page Handlers
// =============================================================================

/// Display the wishlist page.
#[instrument(skip(state, session, identity))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    ResolveIdentity(identity): ResolveIdentity,
) -> Result<WishlistPageTemplate, AppError> {
    let texts = state.config().wishlist.texts.clone();

    let ids = state.wishlist().product_ids(&identity).await?;
    let mut rows = Vec::with_capacity(ids.len());
    for id in &ids {
        // Products that left the catalog are silently dropped from the page.
        if let Some(product) = state.catalog().product(*id).await? {
            rows.push(WishlistRowView::from_product(&product, &state));
        }
    }

    let guest_notice = match &identity {
        WishlistIdentity::Guest(token) if !ids.is_empty() => {
            let remaining = state
                .store()
                .guest_expires_in(token)
                .await?
                .unwrap_or_else(|| state.config().wishlist.guest_ttl());
            Some(replace_tokens(
                &texts.guest_notice,
                &[("{guest_session_in_days}", &humanize_duration(remaining))],
            ))
        }
        _ => None,
    };

    let flash = session
        .remove::<String>(session_keys::FLASH_NOTICE)
        .await?;
    let nonce = nonce::issue(&session).await?;

    Ok(WishlistPageTemplate {
        rows,
        nonce,
        flash,
        guest_notice,
        empty_text: texts.empty,
        add_all_label: texts.add_all_to_cart_label,
    })
}

/// Count badge fragment.
#[instrument(skip(state, identity))]
pub async fn count(
    State(state): State<AppState>,
    ResolveIdentity(identity): ResolveIdentity,
) -> Result<WishlistCountTemplate, AppError> {
    let count = state.wishlist().count(&identity).await?;
    Ok(WishlistCountTemplate { count })
}

/// Non-JS fallback: add synchronously, flash a notice, redirect.
#[instrument(skip(state, session, identity))]
pub async fn add_fallback(
    State(state): State<AppState>,
    session: Session,
    ResolveIdentity(identity): ResolveIdentity,
    Query(query): Query<AddFallbackQuery>,
) -> Result<Response, AppError> {
    let Some(product) = query
        .add_to_wishlist
        .as_deref()
        .and_then(ProductId::from_param)
    else {
        return Ok(Redirect::to("/wishlist").into_response());
    };

    // Unknown products redirect without touching the record.
    if state.catalog().product(product).await?.is_none() {
        return Ok(Redirect::to("/wishlist").into_response());
    }

    let _ = state.wishlist().add(&identity, product).await?;

    let texts = &state.config().wishlist.texts;
    let title = product_title(&state, product).await?;
    let flash = format!(
        "<a href=\"{}\" class=\"button wc-forward\">{}</a> {}",
        state.config().wishlist_url(),
        texts.view_wishlist,
        replace_tokens(&texts.added, &[("{product_name}", &title)]),
    );
    session.insert(session_keys::FLASH_NOTICE, flash).await?;

    Ok(Redirect::to("/wishlist").into_response())
}

// =============================================================================
// AJAX Handlers
// =============================================================================

/// Toggle a product's membership (or remove it outright).
#[instrument(skip(state, session, identity, form))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    ResolveIdentity(identity): ResolveIdentity,
    Form(form): Form<UpdateForm>,
) -> Result<Response, AppError> {
    if !nonce::verify(&session, form.nonce.as_deref()).await? {
        return Err(AppError::NonceRejected);
    }

    let settings = &state.config().wishlist;
    let mut data = UpdateData {
        show_icon: settings.show_icon,
        ..UpdateData::default()
    };

    let Some(product) = form.product_id.as_deref().and_then(ProductId::from_param) else {
        // Invalid product IDs are absorbed, not surfaced.
        return Ok(AjaxSuccess::of(data).into_response());
    };
    data.product_id = product.get();

    match settings.button_action {
        ButtonAction::Redirect => {
            data.redirect = Some(true);
            data.redirect_url = Some(state.config().wishlist_url());
        }
        ButtonAction::Popup => data.popup = Some(true),
        ButtonAction::None => {}
    }

    let texts = &settings.texts;
    let title = product_title(&state, product).await?;

    let action = if flag_is_set(form.remove_product.as_deref()) {
        let _ = state.wishlist().remove(&identity, product).await?;
        UpdateAction::Removed
    } else {
        state.wishlist().toggle(&identity, product).await?
    };

    let message = match action {
        UpdateAction::Added => {
            data.added = Some(true);
            data.loop_item = render_row(&state, product).await?;
            replace_tokens(&texts.added, &[("{product_name}", &title)])
        }
        UpdateAction::Removed => {
            data.removed = Some(true);
            replace_tokens(&texts.removed, &[("{product_name}", &title)])
        }
        UpdateAction::AlreadyInWishlist => {
            data.already_in_wishlist = Some(true);
            replace_tokens(&texts.already_in_wishlist, &[("{product_name}", &title)])
        }
    };
    data.template = Some(render_popup(&state, message)?);

    Ok(AjaxSuccess::of(data).into_response())
}

/// Move one product (or the whole record) to the cart.
#[instrument(skip(state, session, identity, form))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    ResolveIdentity(identity): ResolveIdentity,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    if !nonce::verify(&session, form.nonce.as_deref()).await? {
        return Err(AppError::NonceRejected);
    }

    let settings = &state.config().wishlist;
    let texts = &settings.texts;

    if flag_is_set(form.cart_all.as_deref()) {
        let outcomes = state
            .wishlist()
            .add_all_to_cart(&identity, state.cart())
            .await?;

        let mut lines = Vec::new();
        let mut loop_item = Vec::new();
        for outcome in &outcomes {
            if outcome.added {
                let title = product_title(&state, outcome.product_id).await?;
                lines.push(replace_tokens(&texts.added_to_cart, &[("{product_name}", &title)]));
            } else if let Some(row) = render_row(&state, outcome.product_id).await? {
                // Items the cart refused stay on the page.
                loop_item.push(row);
            }
        }

        let data = AddToCartData {
            added_to_cart: outcomes.iter().any(|o| o.added),
            add_to_cart_notice: CartNoticeTemplate {
                lines,
                cart_url: None,
                view_cart_text: texts.view_cart.clone(),
            }
            .render()?,
            cart_url: None,
            removed: outcomes.iter().any(|o| o.removed).then_some(true),
            loop_item: (!loop_item.is_empty()).then_some(loop_item),
        };
        return Ok(AjaxSuccess::of(data).into_response());
    }

    let Some(product) = form.product_id.as_deref().and_then(ProductId::from_param) else {
        return Ok(AjaxSuccess::of(AddToCartData::default()).into_response());
    };

    let outcome = state
        .wishlist()
        .add_to_cart(&identity, product, state.cart())
        .await?;

    let mut lines = Vec::new();
    if outcome.added {
        let title = product_title(&state, product).await?;
        lines.push(replace_tokens(&texts.added_to_cart, &[("{product_name}", &title)]));
    }
    let cart_url = outcome
        .cart_url
        .filter(|_| outcome.added && settings.redirect_to_cart);

    let data = AddToCartData {
        added_to_cart: outcome.added,
        add_to_cart_notice: CartNoticeTemplate {
            lines,
            cart_url: cart_url.clone(),
            view_cart_text: texts.view_cart.clone(),
        }
        .render()?,
        cart_url,
        removed: outcome.removed.then_some(true),
        loop_item: None,
    };
    Ok(AjaxSuccess::of(data).into_response())
}

/// Remove a product, answering with an undo affordance.
#[instrument(skip(state, session, identity, form))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    ResolveIdentity(identity): ResolveIdentity,
    Form(form): Form<RemoveForm>,
) -> Result<Response, AppError> {
    if !nonce::verify(&session, form.nonce.as_deref()).await? {
        return Err(AppError::NonceRejected);
    }

    let Some(product) = form.product_id.as_deref().and_then(ProductId::from_param) else {
        return Ok(AjaxSuccess::of(RemoveData::default()).into_response());
    };

    let _ = state.wishlist().remove(&identity, product).await?;

    let texts = &state.config().wishlist.texts;
    let title = product_title(&state, product).await?;
    let notice = RemoveNoticeTemplate {
        product_id: product.get(),
        undo_label: texts.undo.clone(),
        message: replace_tokens(&texts.removed, &[("{product_name}", &title)]),
    }
    .render()?;

    Ok(AjaxSuccess::of(RemoveData {
        remove_notice: Some(notice),
    })
    .into_response())
}
