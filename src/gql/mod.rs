pub mod query_interface;

// Store backends. Builds without the driver only get the in-memory graph.
#[cfg(feature = "neo4j")]
pub mod neo4j;

#[cfg(not(feature = "neo4j"))]
pub mod neo4j {
    use crate::persistence::settings::AppSettings;

    pub struct Neo4jStore;

    impl Neo4jStore {
        pub async fn connect(_settings: &AppSettings, _password: &str) -> anyhow::Result<Self> {
            Err(anyhow::anyhow!("built without the `neo4j` feature; enable it or use debug mode"))
        }
    }

    #[async_trait::async_trait]
    impl super::query_interface::GraphStore for Neo4jStore {
        async fn run(&self, _request: &super::query_interface::QueryRequest) -> anyhow::Result<Vec<super::query_interface::ResultRow>> {
            Err(anyhow::anyhow!("neo4j support not compiled in"))
        }
    }
}
