//! Message templates (Telegram HTML parse mode)

use uuid::Uuid;

const CHAT_PREVIEW_CHARS: usize = 200;

/// One purchased line in a buyer summary
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub title: String,
    pub quantity: i64,
    pub price: f64,
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn money(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency.to_uppercase())
}

/// Seller-facing notice for one product in a paid order
pub fn seller_new_sale(
    title: &str,
    quantity: i64,
    amount: f64,
    currency: &str,
    buyer_name: &str,
) -> String {
    format!(
        "🎉 <b>New sale!</b>\n\n📦 Product: {}\n🔢 Quantity: {}\n💰 Amount: {}\n👤 Buyer: {}",
        escape_html(title),
        quantity,
        money(amount, currency),
        escape_html(buyer_name),
    )
}

/// Buyer-facing summary of a paid order
pub fn buyer_order_paid(order_id: Uuid, lines: &[SaleLine], total: f64, currency: &str) -> String {
    let items = lines
        .iter()
        .map(|line| {
            format!(
                "• {} × {}: {}",
                escape_html(&line.title),
                line.quantity,
                money(line.price * line.quantity as f64, currency)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "✅ <b>Payment received</b>\n\nOrder: <code>{}</code>\n\n{}\n\n💳 Total: {}",
        order_id,
        items,
        money(total, currency),
    )
}

/// Recipient-facing notice for a new chat message
pub fn chat_message_received(sender_name: &str, product_title: Option<&str>, content: &str) -> String {
    let preview: String = content.chars().take(CHAT_PREVIEW_CHARS).collect();
    let about = product_title
        .map(|title| format!("\n📦 About: {}", escape_html(title)))
        .unwrap_or_default();

    format!(
        "💬 <b>New message from {}</b>{}\n\n{}",
        escape_html(sender_name),
        about,
        escape_html(&preview),
    )
}
