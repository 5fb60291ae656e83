//! Router - binds paths to render roots and owns the view boundary.
//!
//! A route is a (path pattern, render root, optional destroy hook)
//! triple; registration is idempotent by pattern. Layouts are
//! higher-order render roots registered by path prefix; they receive the
//! inner root as a callable and invoke it at the position they choose.
//!
//! Crossing a route boundary runs the outgoing destroy hook, resets the
//! view arena (clearing view-scoped sequences and bound refs), discards
//! the retained tree so the next pass is a full replace, and activates
//! the incoming root.

use std::rc::Rc;

use crate::arena::ArenaKind;
use crate::driver;
use crate::engine;

/// A page's render root: plain builder calls, no return value.
pub type RenderRoot = Rc<dyn Fn()>;

/// A layout root: receives the inner root as a callable and invokes it
/// at the desired position.
pub type LayoutRoot = Rc<dyn Fn(&dyn Fn())>;

/// Hook run when a route is navigated away from.
pub type DestroyHook = Rc<dyn Fn()>;

// =============================================================================
// Path patterns
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq)]
struct PathPattern {
    segments: Vec<Segment>,
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|seg| match seg.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(seg.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Match a concrete path, binding dynamic segments to named params.
    fn match_path(&self, path: &str) -> Option<Vec<(String, String)>> {
        let parts: Vec<&str> = split_path(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => params.push((name.clone(), (*part).to_string())),
            }
        }
        Some(params)
    }
}

// =============================================================================
// Router state
// =============================================================================

struct Route {
    raw: String,
    pattern: PathPattern,
    root: RenderRoot,
    destroy: Option<DestroyHook>,
}

struct LayoutEntry {
    prefix: String,
    root: LayoutRoot,
    reset: bool,
}

pub(crate) struct Router {
    routes: Vec<Route>,
    layouts: Vec<LayoutEntry>,
    active: Option<usize>,
    active_path: String,
    params: Vec<(String, String)>,
    composed: Option<RenderRoot>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            layouts: Vec::new(),
            active: None,
            active_path: String::new(),
            params: Vec::new(),
            composed: None,
        }
    }

    pub fn register_page(&mut self, pattern: &str, root: RenderRoot, destroy: Option<DestroyHook>) {
        let route = Route {
            raw: pattern.to_string(),
            pattern: PathPattern::parse(pattern),
            root,
            destroy,
        };
        match self.routes.iter_mut().find(|r| r.raw == pattern) {
            Some(existing) => *existing = route,
            None => self.routes.push(route),
        }
    }

    pub fn register_layout(&mut self, prefix: &str, root: LayoutRoot, reset: bool) {
        let entry = LayoutEntry {
            prefix: prefix.to_string(),
            root,
            reset,
        };
        match self.layouts.iter_mut().find(|l| l.prefix == prefix) {
            Some(existing) => *existing = entry,
            None => self.layouts.push(entry),
        }
    }

    fn resolve(&self, path: &str) -> Option<(usize, Vec<(String, String)>)> {
        self.routes
            .iter()
            .enumerate()
            .find_map(|(idx, route)| route.pattern.match_path(path).map(|params| (idx, params)))
    }

    /// Layout prefixes covering `path`, outermost (shortest) first.
    fn layout_indices_for(&self, path: &str) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .layouts
            .iter()
            .enumerate()
            .filter(|(_, l)| path.starts_with(&l.prefix))
            .map(|(i, _)| i)
            .collect();
        indices.sort_by_key(|&i| self.layouts[i].prefix.len());
        indices
    }

    /// Whether crossing from the active path to `path` resets the view
    /// arena. It always does, unless both paths share their innermost
    /// layout and that layout was registered with `reset: false`
    /// (persistent-shell navigation).
    fn resets_view(&self, path: &str) -> bool {
        if self.active.is_none() {
            return true;
        }
        let old = self.layout_indices_for(&self.active_path);
        let new = self.layout_indices_for(path);
        match (old.last(), new.last()) {
            (Some(&a), Some(&b)) if a == b => self.layouts[a].reset,
            _ => true,
        }
    }

    fn active_destroy(&self) -> Option<DestroyHook> {
        let idx = self.active?;
        self.routes[idx].destroy.clone()
    }

    /// Activate a route: bind params and compose the layout chain around
    /// the page root, outermost layout first.
    fn activate(&mut self, idx: usize, path: &str, params: Vec<(String, String)>) {
        let mut composed: RenderRoot = Rc::clone(&self.routes[idx].root);
        for &layout_idx in self.layout_indices_for(path).iter().rev() {
            let layout = Rc::clone(&self.layouts[layout_idx].root);
            let inner = composed;
            composed = Rc::new(move || layout(&*inner));
        }
        self.active = Some(idx);
        self.active_path = path.to_string();
        self.params = params;
        self.composed = Some(composed);
    }

    pub fn composed_root(&self) -> Option<RenderRoot> {
        self.composed.clone()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn active_path(&self) -> &str {
        &self.active_path
    }
}

// =============================================================================
// Public surface
// =============================================================================

/// Register a page route. Idempotent by path pattern: registering the
/// same pattern again replaces the root and destroy hook.
pub fn register_page(
    pattern: &str,
    root: impl Fn() + 'static,
    destroy: Option<Box<dyn Fn()>>,
) {
    let root: RenderRoot = Rc::new(root);
    let destroy: Option<DestroyHook> = destroy.map(|d| Rc::from(d) as DestroyHook);
    let registered = engine::with_engine(|e| {
        e.router.register_page(pattern, Rc::clone(&root), destroy.clone());
    });
    if registered.is_none() {
        log::error!("register_page(`{pattern}`) before init");
    }
}

/// Register a layout wrapper for every route under `prefix`. With
/// `reset: false`, navigating between routes sharing this layout keeps
/// the view arena alive.
pub fn register_layout(prefix: &str, root: impl Fn(&dyn Fn()) + 'static, reset: bool) {
    let root: LayoutRoot = Rc::new(root);
    let registered = engine::with_engine(|e| {
        e.router.register_layout(prefix, Rc::clone(&root), reset);
    });
    if registered.is_none() {
        log::error!("register_layout(`{prefix}`) before init");
    }
}

/// Cross a route boundary.
///
/// Runs the outgoing destroy hook, resets the view arena, discards the
/// retained tree (the next pass is a full replace), activates the
/// incoming root, and requests a pass.
pub fn navigate(path: &str) {
    let plan = engine::with_engine(|e| {
        e.router.resolve(path).map(|(idx, params)| {
            (
                idx,
                params,
                e.router.active_destroy(),
                e.router.resets_view(path),
            )
        })
    });
    let Some(resolved) = plan else {
        log::error!("navigate(`{path}`) before init");
        return;
    };
    let Some((idx, params, destroy, resets_view)) = resolved else {
        log::warn!("navigate: no route matches `{path}`; staying on the active route");
        return;
    };

    if let Some(hook) = destroy {
        hook();
    }

    engine::with_engine(|e| {
        if resets_view {
            e.reset_arena(ArenaKind::View);
        }
        e.router.activate(idx, path, params);
        e.driver.force_full_replace = true;
        e.driver.cycle_requested = true;
        log::debug!("route activated: {path}");
    });
    driver::pump();
}

/// Read a dynamic path segment bound by the active route.
pub fn route_param(name: &str) -> Option<String> {
    engine::with_engine(|e| e.router.param(name)).flatten()
}

/// The path of the active route.
pub fn current_path() -> Option<String> {
    engine::with_engine(|e| e.router.active_path().to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_static_match() {
        let pattern = PathPattern::parse("/docs/guide");
        assert_eq!(pattern.match_path("/docs/guide"), Some(vec![]));
        assert_eq!(pattern.match_path("/docs/other"), None);
        assert_eq!(pattern.match_path("/docs"), None);
        // Trailing slash is tolerated.
        assert_eq!(pattern.match_path("/docs/guide/"), Some(vec![]));
    }

    #[test]
    fn test_pattern_params_bind() {
        let pattern = PathPattern::parse("/users/:id/posts/:post");
        let params = pattern.match_path("/users/42/posts/7").unwrap();
        assert_eq!(
            params,
            vec![
                ("id".to_string(), "42".to_string()),
                ("post".to_string(), "7".to_string())
            ]
        );
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut router = Router::new();
        router.register_page("/a", Rc::new(|| {}), None);
        router.register_page("/a", Rc::new(|| {}), None);
        assert_eq!(router.routes.len(), 1);
    }

    #[test]
    fn test_resolve_picks_first_match() {
        let mut router = Router::new();
        router.register_page("/a", Rc::new(|| {}), None);
        router.register_page("/:anything", Rc::new(|| {}), None);

        let (idx, _) = router.resolve("/a").unwrap();
        assert_eq!(idx, 0);
        let (idx, params) = router.resolve("/b").unwrap();
        assert_eq!(idx, 1);
        assert_eq!(params[0].1, "b");
        assert!(router.resolve("/a/b").is_none());
    }

    #[test]
    fn test_layout_ordering_outermost_first() {
        let mut router = Router::new();
        router.register_layout("/app/admin", Rc::new(|inner| inner()), false);
        router.register_layout("/app", Rc::new(|inner| inner()), false);

        let indices = router.layout_indices_for("/app/admin/users");
        // "/app" (shorter prefix) wraps outermost.
        assert_eq!(indices.len(), 2);
        assert_eq!(router.layouts[indices[0]].prefix, "/app");
        assert_eq!(router.layouts[indices[1]].prefix, "/app/admin");
    }

    #[test]
    fn test_resets_view_rules() {
        let mut router = Router::new();
        router.register_page("/app/a", Rc::new(|| {}), None);
        router.register_page("/app/b", Rc::new(|| {}), None);
        router.register_page("/other", Rc::new(|| {}), None);
        router.register_layout("/app", Rc::new(|inner| inner()), false);

        // First activation always resets.
        assert!(router.resets_view("/app/a"));
        let (idx, params) = router.resolve("/app/a").unwrap();
        router.activate(idx, "/app/a", params);

        // Shared persistent layout: no reset.
        assert!(!router.resets_view("/app/b"));
        // Leaving the layout: reset.
        assert!(router.resets_view("/other"));
    }

    #[test]
    fn test_activate_composes_layouts() {
        use std::cell::RefCell;

        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let mut router = Router::new();
        let o = order.clone();
        router.register_page(
            "/app/home",
            Rc::new(move || o.borrow_mut().push("page")),
            None,
        );
        let o = order.clone();
        router.register_layout(
            "/app",
            Rc::new(move |inner: &dyn Fn()| {
                o.borrow_mut().push("layout-before");
                inner();
                o.borrow_mut().push("layout-after");
            }),
            true,
        );

        let (idx, params) = router.resolve("/app/home").unwrap();
        router.activate(idx, "/app/home", params);
        (router.composed_root().unwrap())();

        assert_eq!(
            order.borrow().as_slice(),
            &["layout-before", "page", "layout-after"]
        );
    }

    #[test]
    fn test_param_lookup() {
        let mut router = Router::new();
        router.register_page("/users/:id", Rc::new(|| {}), None);
        let (idx, params) = router.resolve("/users/alice").unwrap();
        router.activate(idx, "/users/alice", params);
        assert_eq!(router.param("id").as_deref(), Some("alice"));
        assert_eq!(router.param("missing"), None);
    }
}
