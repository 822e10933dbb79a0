pub mod gemini;

use crate::Result;
use crate::chat::{CompletionRequest, CompletionService, FragmentStream};
use async_trait::async_trait;
use dyn_clone::DynClone;

pub trait Client: DynClone + CompletionService + Send + Sync {}

dyn_clone::clone_trait_object!(Client);

#[async_trait]
impl CompletionService for Box<dyn Client> {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        (**self).stream(request).await
    }
}
