use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::db::DocumentStore;
use crate::proto::health::{
    health_check_response::ServingStatus, health_server::Health, HealthCheckRequest,
    HealthCheckResponse,
};

/// Serving while the document store answers a ping.
pub struct HealthServiceImpl {
    store: Arc<dyn DocumentStore>,
}

impl HealthServiceImpl {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn current_status(&self) -> ServingStatus {
        match self.store.ping().await {
            Ok(()) => ServingStatus::Serving,
            Err(e) => {
                tracing::warn!("Health check failed: store={}, error={}", self.store.name(), e);
                ServingStatus::NotServing
            }
        }
    }
}

#[tonic::async_trait]
impl Health for HealthServiceImpl {
    async fn check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        Ok(Response::new(HealthCheckResponse {
            status: self.current_status().await.into(),
        }))
    }

    type WatchStream = tokio_stream::wrappers::ReceiverStream<Result<HealthCheckResponse, Status>>;

    async fn watch(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let status = self.current_status().await;

        tokio::spawn(async move {
            let _ = tx
                .send(Ok(HealthCheckResponse {
                    status: status.into(),
                }))
                .await;
        });

        Ok(Response::new(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDocumentStore;
    use crate::gateway::tests::UnreachableStore;
    use tokio_stream::StreamExt;

    fn request() -> Request<HealthCheckRequest> {
        Request::new(HealthCheckRequest {
            service: String::new(),
        })
    }

    #[tokio::test]
    async fn test_serving_with_reachable_store() {
        let service = HealthServiceImpl::new(Arc::new(MemoryDocumentStore::new()));
        let res = service.check(request()).await.unwrap().into_inner();
        assert_eq!(res.status, ServingStatus::Serving as i32);
    }

    #[tokio::test]
    async fn test_not_serving_with_unreachable_store() {
        let service = HealthServiceImpl::new(Arc::new(UnreachableStore));
        let res = service.check(request()).await.unwrap().into_inner();
        assert_eq!(res.status, ServingStatus::NotServing as i32);
    }

    #[tokio::test]
    async fn test_watch_sends_current_status() {
        let service = HealthServiceImpl::new(Arc::new(MemoryDocumentStore::new()));
        let mut stream = service.watch(request()).await.unwrap().into_inner();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.status, ServingStatus::Serving as i32);
    }
}
