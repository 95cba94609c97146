// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of conversation memory into the memory section.

use tijara_core::Interaction;

/// Renders the most recent `max_messages` turns as customer/agent lines.
///
/// `history` is oldest first. Turns with an empty agent reply (silent turns)
/// render only the customer line.
pub fn render_history(history: &[Interaction], max_messages: usize) -> String {
    let start = history.len().saturating_sub(max_messages);
    let mut lines = Vec::with_capacity((history.len() - start) * 2);
    for turn in &history[start..] {
        lines.push(format!("Customer: {}", turn.user_message.trim()));
        let reply = turn.ai_response.trim();
        if !reply.is_empty() {
            lines.push(format!("Agent: {reply}"));
        }
    }
    lines.join("\n")
}
