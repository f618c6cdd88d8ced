//! Transport protocol resolution for pub/sub servers.

use specbridge_model::Server;

pub const UNKNOWN: &str = "unknown";

/// The protocol written for `server`, by priority:
/// the server's own protocol, then the caller's target protocol, then (for
/// target `auto`) the URL heuristic, then a short description reused as a
/// protocol name, then the URL heuristic regardless.
pub fn resolve_protocol(server: &Server, target: Option<&str>) -> String {
    if let Some(own) = server.protocol.as_deref().filter(|p| !p.trim().is_empty()) {
        return own.to_string();
    }

    match target.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) if t.eq_ignore_ascii_case("auto") => {
            let sniffed = protocol_from_url(&server.url);
            if sniffed != UNKNOWN {
                return sniffed.to_string();
            }
        }
        Some(t) => return t.to_string(),
        None => {}
    }

    if let Some(desc) = server.description.as_deref().map(str::trim) {
        if is_protocol_like(desc) {
            return desc.to_lowercase();
        }
    }

    protocol_from_url(&server.url).to_string()
}

/// Guess a protocol from a URL scheme or well-known broker names.
pub fn protocol_from_url(url: &str) -> &'static str {
    let url = url.to_lowercase();
    let has_scheme = |schemes: &[&str]| {
        schemes
            .iter()
            .any(|s| url.starts_with(&format!("{}://", s)))
    };

    if has_scheme(&["ws", "wss"]) {
        "ws"
    } else if has_scheme(&["amqp", "amqps"]) {
        "amqp"
    } else if has_scheme(&["mqtt", "mqtts"]) {
        "mqtt"
    } else if url.starts_with("kafka://") || url.contains("kafka") {
        "kafka"
    } else if url.contains("rabbitmq") {
        "amqp"
    } else if url.contains("mosquitto") || url.contains("hivemq") {
        "mqtt"
    } else if has_scheme(&["http", "https"]) {
        "http"
    } else {
        UNKNOWN
    }
}

/// A single short token such as `mqtt` or `kafka-secure`.
fn is_protocol_like(text: &str) -> bool {
    !text.is_empty()
        && text.len() <= 16
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(url: &str) -> Server {
        Server::new(url)
    }

    #[test]
    fn url_heuristic_order() {
        assert_eq!(protocol_from_url("wss://stream.example.com"), "ws");
        assert_eq!(protocol_from_url("amqps://broker"), "amqp");
        assert_eq!(protocol_from_url("mqtt://broker:1883"), "mqtt");
        assert_eq!(protocol_from_url("kafka://k1:9092"), "kafka");
        assert_eq!(protocol_from_url("my-kafka-cluster:9092"), "kafka");
        assert_eq!(protocol_from_url("rabbitmq.internal:5672"), "amqp");
        assert_eq!(protocol_from_url("test.mosquitto.org"), "mqtt");
        assert_eq!(protocol_from_url("broker.hivemq.com"), "mqtt");
        assert_eq!(protocol_from_url("https://api.example.com"), "http");
        assert_eq!(protocol_from_url("broker.local"), "unknown");
        // Substring rules win over a plain http scheme.
        assert_eq!(protocol_from_url("http://kafka-rest.example.com"), "kafka");
    }

    #[test]
    fn explicit_protocol_wins() {
        let mut s = server("wss://x");
        s.protocol = Some("stomp".into());
        assert_eq!(resolve_protocol(&s, Some("amqp")), "stomp");
        assert_eq!(resolve_protocol(&s, Some("auto")), "stomp");
    }

    #[test]
    fn target_protocol_beats_heuristic() {
        assert_eq!(resolve_protocol(&server("wss://x"), Some("amqp")), "amqp");
    }

    #[test]
    fn auto_sniffs_then_falls_back_to_description() {
        assert_eq!(resolve_protocol(&server("mqtt://x"), Some("auto")), "mqtt");

        let mut s = server("broker.local");
        s.description = Some("NATS".into());
        assert_eq!(resolve_protocol(&s, Some("auto")), "nats");

        s.description = Some("Production message broker for the EU region".into());
        assert_eq!(resolve_protocol(&s, Some("auto")), "unknown");
    }

    #[test]
    fn no_target_uses_description_before_url() {
        let mut s = server("https://api.example.com");
        s.description = Some("sse".into());
        assert_eq!(resolve_protocol(&s, None), "sse");
        s.description = None;
        assert_eq!(resolve_protocol(&s, None), "http");
    }
}
