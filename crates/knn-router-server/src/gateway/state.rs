use std::sync::Arc;

use knn_router::router::QueryService;

pub struct HandlerState<Q: QueryService> {
    pub router: Arc<Q>,

    /// Reported by `/ready`: `"remote"` or `"local"`.
    pub tokenizer_mode: &'static str,
}

impl<Q: QueryService> Clone for HandlerState<Q> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            tokenizer_mode: self.tokenizer_mode,
        }
    }
}

impl<Q: QueryService> HandlerState<Q> {
    pub fn new(router: Arc<Q>, tokenizer_mode: &'static str) -> Self {
        Self {
            router,
            tokenizer_mode,
        }
    }
}
