use serenity::all::CreateAttachment;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::models::{PageView, RequestState};
use crate::services::{chart_service, view_service};

pub async fn execute(ctx: &Context, msg: &Message, args: &[&str]) -> Result<(), String> {
    tracing::info!("📈 Predict command called with args: {:?}", args);

    let Some(raw_ticker) = args.first() else {
        let help_embed = CreateEmbed::default()
            .title("📈 Predict Command")
            .description("Fetch the recent closing prices and a next-day prediction for a ticker")
            .field("Usage", "`$predict <TICKER>`", false)
            .field("Examples", "`$predict AAPL`\n`$p msft`", false)
            .color(0x00ff00);

        msg.channel_id
            .send_message(ctx, CreateMessage::default().embed(help_embed))
            .await
            .map_err(|e| e.to_string())?;
        return Ok(());
    };
    let ticker = raw_ticker.to_uppercase();

    let (sessions, config) = {
        let data = ctx.data.read().await;
        let sessions = data
            .get::<crate::PredictorSessions>()
            .ok_or("Prediction sessions not initialized".to_string())?
            .clone();
        let config = data
            .get::<crate::Settings>()
            .ok_or("Settings not initialized".to_string())?
            .clone();
        (sessions, config)
    };

    let session = sessions.session(msg.channel_id.get()).await;

    // Submit stays disabled while this channel has a request in flight
    if session.try_submit(&ticker).is_none() {
        let current = view_service::view(&session.state());
        let embed = CreateEmbed::default()
            .title("⏳ Request In Flight")
            .description(format!(
                "A prediction for **{}** is still loading in this channel. Try again when it finishes.",
                current.ticker.as_deref().unwrap_or("another ticker")
            ))
            .color(0xffa500);
        msg.channel_id
            .send_message(ctx, CreateMessage::default().embed(embed))
            .await
            .map_err(|e| e.to_string())?;
        return Ok(());
    }

    let busy_label = view_service::view(&session.state()).submit_label;
    let loading_message = msg
        .channel_id
        .send_message(
            ctx,
            CreateMessage::default().content(format!("⏳ {} {}", busy_label, ticker)),
        )
        .await
        .map_err(|e| e.to_string())?;

    if let Err(e) = msg.channel_id.broadcast_typing(ctx.http.as_ref()).await {
        tracing::warn!("Failed to broadcast typing: {}", e);
    }

    let settled = session.wait_settled().await;
    tracing::info!("Prediction for {} settled as {}", ticker, settled.label());

    if let Err(e) = loading_message.delete(ctx).await {
        tracing::warn!("Failed to delete loading message: {}", e);
    }

    let message = build_page_message(&settled, config.chart_width, config.chart_height);
    msg.channel_id
        .send_message(ctx, message)
        .await
        .map_err(|e| format!("Failed to send prediction: {}", e))?;

    Ok(())
}

/// Turn a settled state into the message shown to the channel
fn build_page_message(state: &RequestState, width: u32, height: u32) -> CreateMessage {
    let page = view_service::view(state);

    if let Some(error) = &page.error_banner {
        return CreateMessage::default().embed(view_service::create_error_embed(error));
    }

    if page.readout.is_none() {
        // Only reachable if another request in the channel superseded ours
        return CreateMessage::default().content("⏳ A newer request for this channel is still loading.");
    }

    match render_attachment(&page, width, height) {
        Some((filename, image)) => {
            let embed = view_service::create_result_embed(&page, Some(&filename));
            CreateMessage::default()
                .embed(embed)
                .add_file(CreateAttachment::bytes(image, filename))
        }
        None => CreateMessage::default().embed(view_service::create_result_embed(&page, None)),
    }
}

/// Rendered chart as (attachment name, PNG bytes), if the page has one
fn render_attachment(page: &PageView, width: u32, height: u32) -> Option<(String, Vec<u8>)> {
    let series = page.series.as_ref()?;
    let ticker = page.ticker.as_deref().unwrap_or("TICKER");

    match chart_service::render_chart(series, ticker, width, height) {
        Ok(image) => {
            tracing::info!("✓ Chart generated successfully: {} bytes", image.len());
            let filename = format!("prediction_{}.png", sanitize_filename(ticker));
            Some((filename, image))
        }
        Err(e) => {
            tracing::error!("Chart generation error for {}: {}", ticker, e);
            None
        }
    }
}

/// Attachment names must stay plain; tickers like `BRK.B` or `^GSPC` get flattened
fn sanitize_filename(ticker: &str) -> String {
    let cleaned: String = ticker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "chart".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AAPL"), "AAPL");
        assert_eq!(sanitize_filename("BRK.B"), "BRK_B");
        assert_eq!(sanitize_filename("^GSPC"), "_GSPC");
        assert_eq!(sanitize_filename(""), "chart");
    }

    #[test]
    fn test_no_attachment_without_history() {
        let page = view_service::view(&RequestState::Idle);
        assert!(render_attachment(&page, 640, 480).is_none());
    }
}
