use serenity::builder::CreateEmbed;
use serenity::model::channel::Message;
use serenity::prelude::Context;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let embed = CreateEmbed::default()
        .title("📖 Stockcast Commands Help")
        .description("**Stockcast** - next-day price predictions with recent closing history.")
        .color(0x00b0f4)
        .field(
            "📈 Predictions",
            "`$predict <TICKER>` (alias `$p`) - Fetch a prediction and chart for a ticker\n`$status` - Show this channel's current prediction state",
            false,
        )
        .field(
            "🎯 General",
            "`$help` - Show this help message",
            false,
        )
        .field(
            "Notes",
            "• Tickers are case-insensitive (`aapl` = `AAPL`)\n\
             • One request per channel at a time; a new one waits until the current one finishes\n\
             • 3-second cooldown per command per user",
            false,
        );

    msg.channel_id
        .send_message(ctx, serenity::builder::CreateMessage::default().embed(embed))
        .await
        .map_err(|e| format!("Failed to send help message: {}", e))?;

    Ok(())
}
