use std::collections::HashMap;
use std::sync::Arc;

use crate::services::auth::strategy::{AuthStrategy, RequestSource};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("no authentication strategy registered for {0}")]
    Unknown(RequestSource),
    #[error("more than one authentication strategy declares {0}")]
    Duplicate(RequestSource),
}

/// Request source → strategy, built once at startup.
///
/// Never mutated afterwards; share it behind an `Arc`.
pub struct StrategyRegistry {
    strategies: HashMap<RequestSource, Arc<dyn AuthStrategy>>,
}

impl StrategyRegistry {
    /// Register each strategy under the source it declares.
    pub fn build(
        strategies: impl IntoIterator<Item = Arc<dyn AuthStrategy>>,
    ) -> Result<Self, StrategyError> {
        let mut map: HashMap<RequestSource, Arc<dyn AuthStrategy>> = HashMap::new();

        for strategy in strategies {
            let source = strategy.source();
            if map.contains_key(&source) {
                return Err(StrategyError::Duplicate(source));
            }
            tracing::debug!(source = %source, "registered authentication strategy");
            map.insert(source, strategy);
        }

        Ok(Self { strategies: map })
    }

    pub fn get(&self, source: RequestSource) -> Result<&Arc<dyn AuthStrategy>, StrategyError> {
        self.strategies
            .get(&source)
            .ok_or(StrategyError::Unknown(source))
    }

    /// Fail startup when a source the gate will dispatch to has no strategy.
    pub fn ensure_registered(&self, sources: &[RequestSource]) -> Result<(), StrategyError> {
        for source in sources {
            self.get(*source)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthRejection;
    use crate::services::auth::headers::HeaderMutation;
    use async_trait::async_trait;
    use axum::http::HeaderMap;

    struct Fixed(RequestSource);

    #[async_trait]
    impl AuthStrategy for Fixed {
        fn source(&self) -> RequestSource {
            self.0
        }

        async fn check(&self, _headers: &HeaderMap) -> Result<HeaderMutation, AuthRejection> {
            Err(AuthRejection::EmptyToken)
        }
    }

    #[test]
    fn registers_by_declared_source() {
        let registry =
            StrategyRegistry::build([Arc::new(Fixed(RequestSource::NewErp)) as Arc<dyn AuthStrategy>])
                .unwrap();

        assert_eq!(registry.len(), 1);
        let strategy = registry.get(RequestSource::NewErp).unwrap();
        assert_eq!(strategy.source(), RequestSource::NewErp);
        assert!(registry.ensure_registered(&[RequestSource::NewErp]).is_ok());
    }

    #[test]
    fn duplicate_source_is_rejected_at_build() {
        let result = StrategyRegistry::build([
            Arc::new(Fixed(RequestSource::NewErp)) as Arc<dyn AuthStrategy>,
            Arc::new(Fixed(RequestSource::NewErp)) as Arc<dyn AuthStrategy>,
        ]);

        assert_eq!(
            result.err(),
            Some(StrategyError::Duplicate(RequestSource::NewErp))
        );
    }

    #[test]
    fn missing_source_is_unknown() {
        let registry = StrategyRegistry::build(Vec::<Arc<dyn AuthStrategy>>::new()).unwrap();

        assert!(registry.is_empty());
        assert_eq!(
            registry.get(RequestSource::NewErp).err(),
            Some(StrategyError::Unknown(RequestSource::NewErp))
        );
        assert_eq!(
            registry.ensure_registered(&[RequestSource::NewErp]),
            Err(StrategyError::Unknown(RequestSource::NewErp))
        );
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_registry() {
        let registry = Arc::new(
            StrategyRegistry::build([Arc::new(Fixed(RequestSource::NewErp)) as Arc<dyn AuthStrategy>])
                .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let strategy = registry.get(RequestSource::NewErp).unwrap().clone();
                strategy.check(&HeaderMap::new()).await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Err(AuthRejection::EmptyToken));
        }
    }
}
