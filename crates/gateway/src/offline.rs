//! Synthesized fallback responses.
//!
//! Served only when both the cache and the network have failed. The offline
//! page must render standalone: its styling is inline and it references no
//! external resources.

use bytes::Bytes;

use crate::strategy::{GatewayResponse, ServedFrom};

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <title>Arkalia-LUNA - Offline</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {
            font-family: Inter, Arial, sans-serif;
            text-align: center;
            padding: 50px;
            background: linear-gradient(135deg, #6366f1, #8b5cf6);
            color: white;
            margin: 0;
        }
        .container {
            background: rgba(255, 255, 255, 0.1);
            backdrop-filter: blur(20px);
            border-radius: 20px;
            padding: 40px;
            max-width: 500px;
            margin: 0 auto;
        }
        h1 { font-size: 2.5rem; margin-bottom: 20px; }
        p { font-size: 1.2rem; opacity: 0.9; }
        .retry-btn {
            background: white;
            color: #6366f1;
            border: none;
            padding: 15px 30px;
            border-radius: 50px;
            font-weight: 600;
            cursor: pointer;
            margin-top: 20px;
            font-size: 1rem;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>Arkalia-LUNA</h1>
        <p>You are currently offline.</p>
        <p>Check your internet connection and try again.</p>
        <button class="retry-btn" onclick="window.location.reload()">
            Retry
        </button>
    </div>
</body>
</html>
"#;

/// Self-contained offline fallback page for failed navigations.
///
/// Returned with a success status so the browser renders it instead of
/// showing an error screen.
pub fn offline_page() -> GatewayResponse {
    GatewayResponse {
        status: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        headers: Vec::new(),
        body: Bytes::from_static(OFFLINE_PAGE.as_bytes()),
        served_from: ServedFrom::Fallback,
    }
}

/// Minimal 503 stub for a static asset with no cache entry and no network.
pub fn asset_unavailable() -> GatewayResponse {
    GatewayResponse {
        status: 503,
        content_type: Some("text/plain; charset=utf-8".to_string()),
        headers: Vec::new(),
        body: Bytes::from_static(b"Resource unavailable while offline"),
        served_from: ServedFrom::Fallback,
    }
}
