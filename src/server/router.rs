//! Ordered route registry.
//!
//! Routes are matched in attachment order and the first hit wins, so a
//! default (catch-all) entry belongs last. Matching is done on raw route
//! bytes; handlers receive the route as `&str` once dispatch has validated
//! it.

use heapless::{String, Vec};

use super::error::Error;
use super::queue::Outbox;
use crate::modem::{MAX_ROUTE_LEN, find_slice};

/// Maximum attached routes.
pub const MAX_ROUTES: usize = 16;

/// How a route pattern is compared against an inbound route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Route equals the pattern exactly.
    Exact,
    /// Route starts with the pattern.
    Prefix,
    /// Route ends with the pattern.
    Suffix,
    /// Route contains the pattern anywhere.
    Contains,
    /// Matches every route; the pattern is ignored.
    Default,
}

/// A route callback.
///
/// Implemented for any `FnMut(&str, u8, &mut Outbox<'_>)`, or manually for
/// stateful handlers. Handlers enqueue responses through the [`Outbox`]; the
/// drain pass of the same tick sends them.
pub trait Handler {
    /// Called when an inbound request matched this route.
    fn handle(&mut self, route: &str, channel: u8, out: &mut Outbox<'_>);
}

impl<F> Handler for F
where
    F: FnMut(&str, u8, &mut Outbox<'_>),
{
    fn handle(&mut self, route: &str, channel: u8, out: &mut Outbox<'_>) {
        self(route, channel, out)
    }
}

struct RouteEntry<'h> {
    pattern: String<MAX_ROUTE_LEN>,
    mode: MatchMode,
    handler: &'h mut dyn Handler,
}

impl core::fmt::Debug for RouteEntry<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct Router<'h> {
    entries: Vec<RouteEntry<'h>, MAX_ROUTES>,
}

impl<'h> Router<'h> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn attach(
        &mut self,
        pattern: &str,
        mode: MatchMode,
        handler: &'h mut dyn Handler,
    ) -> Result<(), Error> {
        let pattern = String::try_from(pattern).map_err(|_| Error::BufferOverflow)?;
        self.entries
            .push(RouteEntry {
                pattern,
                mode,
                handler,
            })
            .map_err(|_| Error::RouteTableFull)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index of the first entry matching `route`, in attachment order.
    pub fn find(&self, route: &[u8]) -> Option<usize> {
        self.entries.iter().position(|entry| entry.matches(route))
    }

    pub fn handler_mut(&mut self, index: usize) -> &mut dyn Handler {
        &mut *self.entries[index].handler
    }
}

impl RouteEntry<'_> {
    fn matches(&self, route: &[u8]) -> bool {
        let pattern = self.pattern.as_bytes();
        match self.mode {
            MatchMode::Default => true,
            _ if pattern.len() > route.len() => false,
            MatchMode::Exact => pattern == route,
            MatchMode::Prefix => route.starts_with(pattern),
            MatchMode::Suffix => route.ends_with(pattern),
            MatchMode::Contains => find_slice(route, pattern).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Handler for Nop {
        fn handle(&mut self, _route: &str, _channel: u8, _out: &mut Outbox<'_>) {}
    }

    #[test]
    fn first_match_in_attachment_order_wins() {
        let (mut a, mut b, mut c) = (Nop, Nop, Nop);
        let mut router = Router::new();
        router.attach("/a", MatchMode::Exact, &mut a).unwrap();
        router.attach("/", MatchMode::Prefix, &mut b).unwrap();
        router.attach("", MatchMode::Default, &mut c).unwrap();

        assert_eq!(router.find(b"/a"), Some(0));
        assert_eq!(router.find(b"/ab"), Some(1));
        assert_eq!(router.find(b"/b"), Some(1));
        assert_eq!(router.find(b"favicon.ico"), Some(2));
    }

    #[test]
    fn match_modes() {
        let (mut a, mut b, mut c) = (Nop, Nop, Nop);
        let mut router = Router::new();
        router.attach(".html", MatchMode::Suffix, &mut a).unwrap();
        router.attach("api", MatchMode::Contains, &mut b).unwrap();
        router.attach("/x", MatchMode::Exact, &mut c).unwrap();

        assert_eq!(router.find(b"/index.html"), Some(0));
        assert_eq!(router.find(b"/v1/api/list"), Some(1));
        assert_eq!(router.find(b"/x"), Some(2));
        assert_eq!(router.find(b"/y"), None);
    }

    #[test]
    fn pattern_longer_than_route_never_matches() {
        let mut a = Nop;
        let mut router = Router::new();
        router.attach("/index", MatchMode::Prefix, &mut a).unwrap();
        assert_eq!(router.find(b"/i"), None);
    }

    #[test]
    fn clear_empties_the_table() {
        let mut a = Nop;
        let mut router = Router::new();
        router.attach("/", MatchMode::Prefix, &mut a).unwrap();
        router.clear();
        assert_eq!(router.find(b"/"), None);
    }

    #[test]
    fn table_capacity_is_enforced() {
        let mut handlers = [const { Nop }; MAX_ROUTES + 1];
        let mut router = Router::new();
        let mut result = Ok(());
        for handler in handlers.iter_mut() {
            result = router.attach("/", MatchMode::Prefix, handler);
        }
        assert_eq!(result, Err(Error::RouteTableFull));
    }
}
