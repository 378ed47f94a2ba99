//! The generic priority-ordered dispatch loop shared by every capability.

use crate::error::{DispatchError, DispatchResult};
use crate::registry::{CapabilitySet, Capable};
use crate::session::CancelToken;
use flicker_core::{ProviderError, ProviderResult};

/// How the loop treats what a provider hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Skip on absent or failed results, stop at the first value.
    FirstSuccess,
    /// Skip on absent results, stop at the first value, abort on the first failure.
    FirstSuccessOrAbort,
    /// Call every provider; only cancellation stops the loop.
    Broadcast,
}

/// One provider's answer.
#[derive(Debug)]
pub enum Step<T> {
    Skip,
    Yield(T),
    Fail(ProviderError),
}

impl<T> Step<T> {
    /// Maps the `Option<ProviderResult<_>>` shape that openers return.
    pub fn from_outcome(outcome: Option<ProviderResult<T>>) -> Self {
        match outcome {
            None => Step::Skip,
            Some(Ok(value)) => Step::Yield(value),
            Some(Err(err)) => Step::Fail(err),
        }
    }
}

impl<T> From<Option<T>> for Step<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Step::Yield(value),
            None => Step::Skip,
        }
    }
}

/// How a dispatch ended.
pub enum Dispatch<'s, C: ?Sized, T> {
    Found { winner: &'s Capable<C>, value: T },
    Failed { provider: &'s Capable<C>, error: ProviderError },
    Exhausted,
    Cancelled,
}

impl<'s, C: ?Sized, T> Dispatch<'s, C, T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Dispatch::Cancelled)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Dispatch::Found { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Exhaustion reads as "no provider found".
    pub fn into_result(self) -> DispatchResult<T> {
        match self {
            Dispatch::Found { value, .. } => Ok(value),
            Dispatch::Failed { error, .. } => Err(DispatchError::Provider(error)),
            Dispatch::Exhausted => Err(DispatchError::NoProvider),
            Dispatch::Cancelled => Err(DispatchError::Cancelled),
        }
    }
}

/// Walks `set` in priority order, polling `token` before every provider call.
pub fn dispatch<'s, C, T, F>(
    set: &'s CapabilitySet<C>,
    token: &CancelToken,
    policy: Policy,
    mut call: F,
) -> Dispatch<'s, C, T>
where
    C: ?Sized,
    F: FnMut(&C) -> Step<T>,
{
    for entry in set {
        if token.is_cancelled() {
            tracing::debug!(
                capability = %set.kind(),
                provider = entry.name(),
                epoch = token.epoch(),
                "dispatch cancelled"
            );
            return Dispatch::Cancelled;
        }

        match (call(entry.handle()), policy) {
            (Step::Skip, _) => {}
            (Step::Yield(_), Policy::Broadcast) => {}
            (Step::Yield(value), _) => {
                return Dispatch::Found {
                    winner: entry,
                    value,
                }
            }
            (Step::Fail(error), Policy::FirstSuccessOrAbort) => {
                tracing::debug!(
                    capability = %set.kind(),
                    provider = entry.name(),
                    error = %error,
                    "provider failed, aborting dispatch"
                );
                return Dispatch::Failed {
                    provider: entry,
                    error,
                };
            }
            (Step::Fail(error), _) => {
                tracing::warn!(
                    capability = %set.kind(),
                    provider = entry.name(),
                    error = %error,
                    "provider failed, trying next"
                );
            }
        }
    }

    Dispatch::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CapabilityKind, ProviderRegistry};
    use crate::session::{EpochKind, SessionGuard};
    use flicker_core::{
        PluginsConfig, Provider, ProviderDescriptor, ScrapeItemCapability, PlaylistItem,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns a scripted answer and counts how often it was asked.
    struct Scripted {
        priority: i32,
        answer: Option<Result<u32, &'static str>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn answer(&self) -> Step<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Step::from_outcome(
                self.answer
                    .map(|a| a.map_err(ProviderError::other)),
            )
        }
    }

    impl ScrapeItemCapability for Scripted {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn scrape_item(&self, _item: &mut PlaylistItem) {}
    }

    impl Provider for Scripted {
        fn as_scrape_item(self: Arc<Self>) -> Option<Arc<dyn ScrapeItemCapability>> {
            Some(self)
        }
    }

    /// Registers the scripted providers and keeps their concrete handles for `call`.
    fn fixture(
        answers: &[(&str, i32, Option<Result<u32, &'static str>>)],
    ) -> (ProviderRegistry, Vec<Arc<Scripted>>) {
        let scripted: Vec<Arc<Scripted>> = answers
            .iter()
            .map(|(_, priority, answer)| {
                Arc::new(Scripted {
                    priority: *priority,
                    answer: *answer,
                    calls: Arc::new(AtomicUsize::new(0)),
                })
            })
            .collect();
        let descriptors: Vec<ProviderDescriptor> = answers
            .iter()
            .zip(&scripted)
            .map(|((name, _, _), provider)| {
                let provider = Arc::clone(provider);
                ProviderDescriptor::new(*name, "1.0.0", move |_| {
                    Ok(Arc::clone(&provider) as Arc<dyn Provider>)
                })
            })
            .collect();
        let registry = ProviderRegistry::load(&descriptors, &PluginsConfig::default(), 1);
        (registry, scripted)
    }

    fn run(
        registry: &ProviderRegistry,
        scripted: &[Arc<Scripted>],
        token: &CancelToken,
        policy: Policy,
    ) -> (Vec<String>, DispatchResult<u32>) {
        let set = registry.index().scrape_item();
        let names = set.names();
        let mut order = Vec::new();
        let outcome = dispatch(set, token, policy, |_| {
            let name = names[order.len()];
            order.push(name.to_string());
            let index = registry
                .providers()
                .iter()
                .position(|p| p.name() == name)
                .unwrap();
            scripted[index].answer()
        });
        (order, outcome.into_result())
    }

    #[test]
    fn first_success_skips_absent_and_failed() {
        let (registry, scripted) = fixture(&[
            ("absent", 1, None),
            ("broken", 2, Some(Err("bad"))),
            ("good", 3, Some(Ok(7))),
            ("never", 4, Some(Ok(9))),
        ]);
        let token = Arc::new(SessionGuard::new()).token(EpochKind::Item);
        let (order, value) = run(&registry, &scripted, &token, Policy::FirstSuccess);

        assert_eq!(order, vec!["absent", "broken", "good"]);
        assert_eq!(value, Ok(7));
        assert_eq!(scripted[3].calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let (registry, scripted) = fixture(&[
            ("good", 2, Some(Ok(1))),
            ("broken", 1, Some(Err("bad url"))),
        ]);
        let token = Arc::new(SessionGuard::new()).token(EpochKind::Open);
        let (order, value) = run(&registry, &scripted, &token, Policy::FirstSuccessOrAbort);

        assert_eq!(order, vec!["broken"]);
        assert_eq!(
            value,
            Err(DispatchError::Provider(ProviderError::other("bad url")))
        );
        assert_eq!(scripted[0].calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn broadcast_reaches_everyone() {
        let (registry, scripted) = fixture(&[
            ("a", 1, Some(Ok(1))),
            ("b", 2, Some(Err("ignored"))),
            ("c", 3, None),
        ]);
        let token = Arc::new(SessionGuard::new()).token(EpochKind::Item);
        let (order, value) = run(&registry, &scripted, &token, Policy::Broadcast);

        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(value, Err(DispatchError::NoProvider));
    }

    #[test]
    fn interrupt_cancels_before_the_first_call() {
        let (registry, scripted) = fixture(&[("a", 1, Some(Ok(1)))]);
        let guard = Arc::new(SessionGuard::new());
        let token = guard.token(EpochKind::Item);
        guard.interrupt();

        let (order, value) = run(&registry, &scripted, &token, Policy::FirstSuccess);
        assert!(order.is_empty());
        assert_eq!(value, Err(DispatchError::Cancelled));
    }

    #[test]
    fn exhaustion_maps_to_no_provider() {
        let (registry, _) = fixture(&[]);
        let token = Arc::new(SessionGuard::new()).token(EpochKind::Open);
        let outcome: Dispatch<'_, _, u32> = dispatch(
            registry.index().scrape_item(),
            &token,
            Policy::FirstSuccessOrAbort,
            |_| Step::Skip,
        );
        assert_eq!(outcome.into_result(), Err(DispatchError::NoProvider));
        assert_eq!(
            registry.index().scrape_item().kind(),
            CapabilityKind::ScrapeItem
        );
    }
}
