use crate::connector::{ConnectorRole, KronicleConnector};

/// Read-only access to the data routes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderRoutes;

impl ConnectorRole for ReaderRoutes {
    fn prefix(&self) -> &'static str {
        "data/v1"
    }
}

pub type KronicleReader = KronicleConnector<ReaderRoutes>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_targets_data_routes() {
        let reader = KronicleReader::new("http://127.0.0.1:8000");
        assert_eq!(reader.prefix(), "data/v1");
        assert_eq!(
            reader.route_url("channels"),
            "http://127.0.0.1:8000/data/v1/channels"
        );
    }
}
