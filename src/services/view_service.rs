use serenity::all::CreateEmbedFooter;
use serenity::builder::CreateEmbed;

use crate::models::{PageView, RequestState};
use crate::services::series_service;

pub const SUBMIT_LABEL: &str = "Predict";
pub const BUSY_LABEL: &str = "Loading...";

const COLOR_SUCCESS: u32 = 0x22c55e;
const COLOR_ERROR: u32 = 0xff0000;
const COLOR_BUSY: u32 = 0xffa500;
const COLOR_IDLE: u32 = 0x00b0f4;

/// Derive everything a page shows from its request state
pub fn view(state: &RequestState) -> PageView {
    let mut page = PageView {
        ticker: None,
        submit_label: SUBMIT_LABEL,
        submit_enabled: true,
        error_banner: None,
        readout: None,
        last_close: None,
        change_pct: None,
        history_len: 0,
        series: None,
    };

    match state {
        RequestState::Idle => {}
        RequestState::Loading { ticker } => {
            page.ticker = Some(ticker.clone());
            page.submit_label = BUSY_LABEL;
            page.submit_enabled = false;
        }
        RequestState::Failed(message) => {
            page.error_banner = Some(message.clone());
        }
        RequestState::Succeeded(result) => {
            page.ticker = Some(result.ticker.clone());
            page.readout = Some(format_price(result.predicted_price));
            page.history_len = result.history.len();
            page.series = series_service::project(&result.history, Some(result.predicted_price));

            if let Some(last_close) = result.last_close() {
                page.last_close = Some(format_price(last_close));
                page.change_pct = format_change(last_close, result.predicted_price);
            }
        }
    }

    page
}

/// Currency-like rendering: `$1,234.56`, `-$3.50`, `n/a` for non-finite values
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }

    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

/// Percentage move from `from` to `to`, e.g. `+1.25%`
pub fn format_change(from: f64, to: f64) -> Option<String> {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        return None;
    }
    let pct = (to - from) / from.abs() * 100.0;
    Some(format!("{:+.2}%", pct))
}

/// Red banner shown only in the Failed state
pub fn create_error_embed(message: &str) -> CreateEmbed {
    CreateEmbed::default()
        .title("❌ Prediction Failed")
        .description(message)
        .color(COLOR_ERROR)
}

/// Readout for a succeeded request. `chart_file` is the attachment name of the
/// rendered chart, if one was produced.
pub fn create_result_embed(page: &PageView, chart_file: Option<&str>) -> CreateEmbed {
    let ticker = page.ticker.as_deref().unwrap_or("?");
    let readout = page.readout.as_deref().unwrap_or("n/a");

    let mut embed = CreateEmbed::default()
        .title(format!("📈 {} Next-Day Prediction", ticker))
        .field("Next-Day Prediction", format!("**{}**", readout), false)
        .color(COLOR_SUCCESS);

    if let Some(last_close) = &page.last_close {
        embed = embed.field("Last Close", last_close, true);
    }
    if let Some(change) = &page.change_pct {
        embed = embed.field("Change", change, true);
    }

    embed = match (&page.series, chart_file) {
        (Some(_), Some(file)) => embed.image(format!("attachment://{}", file)),
        (Some(_), None) => embed.field("Chart", "⚠️ Chart could not be rendered", false),
        (None, _) => embed.field("Chart", "No price history returned", false),
    };

    embed.footer(CreateEmbedFooter::new(format!(
        "History: {} day(s)",
        page.history_len
    )))
}

/// Summary of a channel's current state for `$status`
pub fn create_status_embed(state: &RequestState, uptime: &str) -> CreateEmbed {
    let page = view(state);
    let (description, color) = match state {
        RequestState::Idle => (
            "No prediction requested in this channel yet.".to_string(),
            COLOR_IDLE,
        ),
        RequestState::Loading { ticker } => (format!("⏳ {} {}", BUSY_LABEL, ticker), COLOR_BUSY),
        RequestState::Failed(message) => (format!("❌ {}", message), COLOR_ERROR),
        RequestState::Succeeded(result) => (
            format!(
                "{} next-day prediction: **{}** (fetched {})",
                result.ticker,
                page.readout.as_deref().unwrap_or("n/a"),
                result.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            COLOR_SUCCESS,
        ),
    };

    CreateEmbed::default()
        .title("📊 Prediction Status")
        .description(description)
        .field("State", state.label(), true)
        .field("Submit", page.submit_label, true)
        .field("Uptime", uptime, false)
        .color(color)
}
