// Sale notification - message formatting and hand-off to a posting transport
use crate::error::CoreError;
use crate::metadata::HttpClient;
use crate::models::SaleEvent;
use async_trait::async_trait;
use log::{debug, error, info, warn};

pub type PostResult<T> = Result<T, CoreError>;

/// Social posting transport.
#[async_trait(?Send)]
pub trait SocialPoster {
    /// Upload an image and return the media id to attach to a post.
    async fn upload_media(&self, bytes: &[u8]) -> PostResult<String>;

    /// Publish a status update; returns the id of the created post.
    async fn post_status(&self, text: &str, media_ids: &[String]) -> PostResult<String>;
}

/// Receives qualifying sales from the poller.
#[async_trait(?Send)]
pub trait SaleNotifier {
    async fn notify(&self, sale: &SaleEvent) -> Result<(), CoreError>;
}

/// Fixed-template status text for a sale.
pub fn format_sale_message(sale: &SaleEvent, explorer_base_url: &str) -> String {
    format!(
        "{name} sold for {price} SOL on {marketplace}!\n{time}\n{explorer}{signature}",
        name = sale.metadata.name,
        price = format_price(sale.price_sol),
        marketplace = sale.marketplace,
        time = sale.sale_time,
        explorer = explorer_base_url,
        signature = sale.signature,
    )
}

/// Up to 4 decimals, trailing zeros dropped: `12.5`, `0.0123`, `40`.
pub fn format_price(price_sol: f64) -> String {
    let s = format!("{:.4}", price_sol);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Framed summary block written to the log for every qualifying sale.
pub fn log_sale_summary(sale: &SaleEvent) {
    info!("-------------------------------------------");
    info!("Sale at {} ---> {} SOL", sale.sale_time, format_price(sale.price_sol));
    info!("Signature: {}", sale.signature);
    info!("Name: {}", sale.metadata.name);
    info!("Image: {}", sale.metadata.image_uri);
    info!("Marketplace: {}", sale.marketplace);
    info!("-------------------------------------------");
}

/// Best-effort readable reason from an API error body.
///
/// Understands the `{"detail": ..}`, `{"title": ..}` and
/// `{"errors": [{"message": ..}]}` shapes; falls back to the raw body.
pub fn extract_error_reason(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(detail) = v.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
        if let Some(messages) = v.get("errors").and_then(|e| e.as_array()) {
            let joined: Vec<&str> = messages
                .iter()
                .filter_map(|m| m.get("message").and_then(|s| s.as_str()))
                .collect();
            if !joined.is_empty() {
                return joined.join("; ");
            }
        }
        if let Some(title) = v.get("title").and_then(|d| d.as_str()) {
            return title.to_string();
        }
        if let Some(err) = v.get("error").and_then(|d| d.as_str()) {
            return err.to_string();
        }
    }
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Posts qualifying sales, optionally with the asset image attached.
pub struct Dispatcher<'a, P: SocialPoster + ?Sized, H: HttpClient + ?Sized> {
    poster: &'a P,
    http_client: &'a H,
    attach_image: bool,
    explorer_base_url: String,
}

impl<'a, P: SocialPoster + ?Sized, H: HttpClient + ?Sized> Dispatcher<'a, P, H> {
    pub fn new(poster: &'a P, http_client: &'a H, attach_image: bool, explorer_base_url: impl Into<String>) -> Self {
        Self {
            poster,
            http_client,
            attach_image,
            explorer_base_url: explorer_base_url.into(),
        }
    }

    /// Image upload is optional; a failure there degrades to a text-only post.
    async fn upload_image(&self, sale: &SaleEvent) -> Vec<String> {
        let image_uri = sale.metadata.image_uri.trim();
        if !self.attach_image || image_uri.is_empty() {
            return Vec::new();
        }
        let bytes = match self.http_client.fetch_bytes(image_uri).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Could not fetch image {} for {}: {}", image_uri, sale.signature, e);
                return Vec::new();
            }
        };
        match self.poster.upload_media(&bytes).await {
            Ok(media_id) => {
                debug!("Uploaded image for {} as media {}", sale.signature, media_id);
                vec![media_id]
            }
            Err(e) => {
                warn!("Image upload failed for {}: {}", sale.signature, e);
                Vec::new()
            }
        }
    }
}

#[async_trait(?Send)]
impl<'a, P: SocialPoster + ?Sized, H: HttpClient + ?Sized> SaleNotifier for Dispatcher<'a, P, H> {
    async fn notify(&self, sale: &SaleEvent) -> Result<(), CoreError> {
        log_sale_summary(sale);
        let text = format_sale_message(sale, &self.explorer_base_url);
        let media_ids = self.upload_image(sale).await;

        match self.poster.post_status(&text, &media_ids).await {
            Ok(post_id) => {
                info!("Sale posted for {} (post id {})", sale.signature, post_id);
                Ok(())
            }
            Err(e) => {
                error!("Something went wrong posting sale {}: {}", sale.signature, e);
                Err(e)
            }
        }
    }
}

/// Poster used when posting is disabled: the status goes to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyPoster;

#[async_trait(?Send)]
impl SocialPoster for LogOnlyPoster {
    async fn upload_media(&self, bytes: &[u8]) -> PostResult<String> {
        debug!("Dry run: skipping upload of {} bytes", bytes.len());
        Ok("dry-run-media".to_string())
    }

    async fn post_status(&self, text: &str, media_ids: &[String]) -> PostResult<String> {
        info!("Dry run post ({} media): {}", media_ids.len(), text);
        Ok("dry-run".to_string())
    }
}
