use hrdc::types::{Message, Sender, SubscriptionStatus, Thread, UsageStatus};
use hrdc::persist::FREE_DAILY_QUERY_LIMIT;

pub fn thread_list(threads: &[Thread], current: Option<&str>) -> String {
    if threads.is_empty() {
        return "No conversations yet. Type a message to start one.".to_string();
    }
    threads
        .iter()
        .enumerate()
        .map(|(i, thread)| {
            let marker = if Some(thread.id.as_str()) == current { '*' } else { ' ' };
            format!(
                "{} {:>2}. {} ({} messages, {})",
                marker,
                i + 1,
                thread.title,
                thread.messages.len(),
                thread.updated_at.format("%Y-%m-%d %H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn message(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Ai => "assistant",
    };
    format!("[{}] {}", who, message.content)
}

pub fn usage(usage: &UsageStatus, subscription: &SubscriptionStatus) -> String {
    if subscription.is_unlimited() {
        let until = subscription
            .expires_at
            .map(|at| format!(" until {}", at.format("%Y-%m-%d")))
            .unwrap_or_default();
        return format!("Standard plan{}: unlimited queries ({} today)", until, usage.queries_today);
    }
    format!(
        "Free plan: {} of {} queries used today",
        usage.queries_today, FREE_DAILY_QUERY_LIMIT
    )
}
