//! User-facing message texts.

/// Body of the scheduled prompt DM.
pub fn prompt_message(prompt: &str) -> String {
    format!(
        "Hey! 👋 Here's your content prompt for today:\n\n_{prompt}_\n\n\
         Reply with a voice memo and I'll handle the rest. 🎙️"
    )
}

/// Post to the team channel for one accepted reply.
pub fn publication_message(date: &str, prompt: &str, response: &str) -> String {
    format!(
        "🎙️ *New content idea — {date}*\n\n*Prompt:* {prompt}\n\n\
         *Transcript:*\n{response}\n\n✅ Logged to the channel canvas."
    )
}

/// Confirmation sent back to the sender.
pub fn acknowledgment_message(publish_channel: &str) -> String {
    format!("✅ Got it! Your voice memo has been transcribed and posted to <#{publish_channel}>.")
}

/// Notice to the sender when extraction fails.
pub const SENDER_FAILURE_NOTICE: &str =
    "⚠️ I couldn't transcribe that voice memo. Could you try re-recording and sending it again?";

/// Notice to the team channel when extraction fails.
pub fn channel_failure_notice(reason: &str) -> String {
    format!("⚠️ Voice memo transcription failed: {reason}")
}
