pub mod help;
pub mod predict;
pub mod status;

use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::utils::check_cooldown;

pub async fn handle_message(ctx: &Context, msg: &Message) {
    if msg.author.bot {
        return;
    }

    // Parse command and arguments
    let parts: Vec<&str> = msg.content.split_whitespace().collect();
    let Some((&command, args)) = parts.split_first() else {
        return;
    };

    if !is_command(command) {
        return;
    }

    if let Err((remaining, should_warn)) = check_cooldown(msg.author.id, command).await {
        tracing::debug!("User {} on cooldown for {} ({}s left)", msg.author.id, command, remaining);
        if should_warn {
            let _ = msg
                .channel_id
                .send_message(
                    ctx,
                    serenity::builder::CreateMessage::default().embed(
                        serenity::builder::CreateEmbed::default()
                            .title("Command Cooldown")
                            .description(format!(
                                "⏳ Please wait {} seconds before using this command again.",
                                remaining
                            ))
                            .color(0xffa500),
                    ),
                )
                .await;
        }
        return;
    }

    let result = match command {
        "$predict" | "$p" => predict::execute(ctx, msg, args).await,
        "$status" => status::execute(ctx, msg).await,
        "$help" => help::execute(ctx, msg).await,
        _ => return,
    };

    if let Err(e) = result {
        tracing::error!("❌ Error executing command {}: {}", command, e);

        let embed = serenity::builder::CreateEmbed::default()
            .title("Command Error")
            .description(format!("❌ {}", e))
            .color(0xff0000);

        let _ = msg
            .channel_id
            .send_message(ctx, serenity::builder::CreateMessage::default().embed(embed))
            .await;
    }
}

fn is_command(word: &str) -> bool {
    matches!(word, "$predict" | "$p" | "$status" | "$help")
}
