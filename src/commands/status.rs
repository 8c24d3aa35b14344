use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::models::RequestState;
use crate::services::view_service;

pub async fn execute(ctx: &Context, msg: &Message) -> Result<(), String> {
    let (sessions, started) = {
        let data = ctx.data.read().await;
        let sessions = data
            .get::<crate::PredictorSessions>()
            .ok_or("Prediction sessions not initialized".to_string())?
            .clone();
        (sessions, data.get::<crate::BotData>().copied())
    };

    let state = match sessions.existing(msg.channel_id.get()).await {
        Some(session) => session.state(),
        None => RequestState::Idle,
    };

    let uptime = match started {
        Some(started) => {
            let elapsed = started.elapsed().as_secs();
            format!("{}h {}m {}s", elapsed / 3600, (elapsed % 3600) / 60, elapsed % 60)
        }
        None => "Unknown".to_string(),
    };

    let embed = view_service::create_status_embed(&state, &uptime);
    msg.channel_id
        .send_message(ctx, serenity::builder::CreateMessage::default().embed(embed))
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}
