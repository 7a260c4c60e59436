use crate::cancel::client_for;
use anyhow::Result;
use gh_client::{ClientProvider, Review, ReviewState};
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answers whether a pull request has been approved
///
/// A PR counts as approved once any review on it carries the approved
/// state, even if later reviews requested changes or the approval was
/// dismissed afterwards.
#[derive(Clone)]
pub struct ApprovalResolver {
    provider: Arc<dyn ClientProvider>,
}

impl ApprovalResolver {
    pub fn new(provider: Arc<dyn ClientProvider>) -> Self {
        Self { provider }
    }

    pub async fn is_approved(
        &self,
        owner: &str,
        name: &str,
        number: u64,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let client = client_for(self.provider.as_ref(), cancel).await?;

        let reviews = client.fetch_reviews(owner, name, number).await?;
        let approved = has_approval(&reviews);
        debug!(
            "{}/{}#{}: {} reviews, approved: {}",
            owner,
            name,
            number,
            reviews.len(),
            approved
        );
        Ok(approved)
    }
}

pub fn has_approval(reviews: &[Review]) -> bool {
    reviews.iter().any(|r| r.state == ReviewState::Approved)
}
