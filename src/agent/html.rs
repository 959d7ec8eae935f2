//! Canned HTML shown when the model cannot produce an itinerary.

use crate::agent::TravelDetails;
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Quota,
    Unavailable,
    Other(String),
}

/// Buckets a provider failure by status code, then by message text.
pub fn classify(err: &ProviderError) -> FailureKind {
    match err {
        ProviderError::Timeout(_) => return FailureKind::Timeout,
        ProviderError::Status { status: 429, .. } => return FailureKind::Quota,
        ProviderError::Status { status: 503, .. } => return FailureKind::Unavailable,
        _ => {}
    }

    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FailureKind::Timeout
    } else if lower.contains("quota")
        || lower.contains("too many requests")
        || lower.contains("resource_exhausted")
    {
        FailureKind::Quota
    } else if lower.contains("service unavailable") || lower.contains("overloaded") {
        FailureKind::Unavailable
    } else {
        FailureKind::Other(message)
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn notice(background: &str, border: &str, color: &str, title: &str, body: &str) -> String {
    format!(
        r#"<div style="padding: 20px; background-color: {background}; border: 1px solid {border}; border-radius: 8px; margin: 20px 0;">
  <h3 style="color: {color}; margin: 0 0 10px 0;">{title}</h3>
  {body}
</div>"#
    )
}

pub fn failure_html(kind: &FailureKind) -> String {
    const WARN_BG: &str = "#fff3cd";
    const WARN_BORDER: &str = "#ffeaa7";
    const WARN_TEXT: &str = "#856404";

    match kind {
        FailureKind::Timeout => notice(
            WARN_BG, WARN_BORDER, WARN_TEXT,
            "⏱️ Yêu cầu xử lý quá lâu",
            r#"<p style="color: #856404; margin: 0;">Xin lỗi, yêu cầu của bạn mất quá nhiều thời gian để xử lý. Vui lòng thử lại với câu hỏi ngắn gọn hơn.</p>"#,
        ),
        FailureKind::Quota => notice(
            WARN_BG, WARN_BORDER, WARN_TEXT,
            "🚫 Đã đạt giới hạn API",
            r#"<p style="color: #856404; margin: 0;">Đã đạt giới hạn API trong ngày. Vui lòng thử lại sau hoặc liên hệ hỗ trợ.</p>"#,
        ),
        FailureKind::Unavailable => notice(
            WARN_BG, WARN_BORDER, WARN_TEXT,
            "🛠️ Dịch vụ AI tạm thời gián đoạn",
            r#"<p style="color: #856404; margin: 0;">Dịch vụ AI đang quá tải hoặc bảo trì. Vui lòng thử lại sau ít phút.</p>"#,
        ),
        FailureKind::Other(message) => notice(
            "#f8d7da", "#f5c6cb", "#721c24",
            "⚠️ Lỗi Hệ Thống",
            &format!(
                r#"<p style="color: #721c24; margin: 0;">Xin lỗi, đã có lỗi xảy ra khi xử lý yêu cầu của bạn. Vui lòng thử lại sau.</p>
  <p style="color: #721c24; margin: 10px 0 0 0; font-size: 14px;"><strong>Lỗi:</strong> {}</p>"#,
                escape_html(message)
            ),
        ),
    }
}

/// Shown when no model is configured or the model returned nothing.
pub fn itinerary_fallback(query: &str, details: &TravelDetails) -> String {
    let row = |label: &str, value: &Option<String>| {
        value
            .as_deref()
            .map(|v| format!("<p><strong>{}:</strong> {}</p>", label, escape_html(v)))
            .unwrap_or_default()
    };
    let passengers = details.passengers.map(|p| p.to_string());

    format!(
        r#"<div style="padding: 20px; font-family: Arial, sans-serif;">
  <h2 style="color: #2c3e50;">🌟 Kế Hoạch Du Lịch</h2>
  <div style="background: #e3f2fd; padding: 15px; border-radius: 8px; margin: 15px 0;">
    <h3 style="color: #1565c0;">📍 Yêu cầu của bạn</h3>
    <p><strong>Truy vấn:</strong> {query}</p>
    {origin}{destination}{departure}{ret}{passengers}
  </div>
  <div style="background: #fff3e0; padding: 15px; border-radius: 8px;">
    <p style="color: #ef6c00; margin: 0;">🔧 AI đang được cập nhật. Vui lòng thử lại sau!</p>
  </div>
</div>"#,
        query = escape_html(query),
        origin = row("Điểm đi", &details.origin),
        destination = row("Điểm đến", &details.destination),
        departure = row("Ngày đi", &details.departure_date),
        ret = row("Ngày về", &details.return_date),
        passengers = row("Số hành khách", &passengers),
    )
}
