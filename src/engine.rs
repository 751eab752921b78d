//! The session owns every piece of mutable graph state and is the only
//! writer. Structural transitions rebuild the working view from
//! `(network, filter, mode, matches, viewport)` and never patch it.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use eframe::egui::Vec2;

use crate::ai::{MatchMap, MatchResult, QueryError};
use crate::network::{Network, Node};
use crate::sim::{PhysicsConfig, Simulation};
use crate::view::{
    LayoutMode, NodeStyle, Pin, ViewFilter, Viewport, WorkingView, apply_layout,
    compute_working_view, derive_styles,
};

#[derive(Clone, Debug)]
pub struct PositionSnapshot {
    pub revision: u64,
    pub positions: Arc<[Vec2]>,
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
    ViewRebuilt { revision: u64, node_count: usize },
    Positions(PositionSnapshot),
    SelectionChanged(Option<String>),
}

#[derive(Clone, Debug)]
pub struct ActiveMatch {
    pub query: String,
    pub result: MatchResult,
    pub map: MatchMap,
}

impl ActiveMatch {
    /// Suggested ids that name nobody in `network`.
    pub fn unknown_ids(&self, network: &Network) -> usize {
        self.result
            .ids()
            .iter()
            .filter(|id| !network.contains(id))
            .count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryStatus {
    Applied { matched: usize },
    Stale,
    Transient(String),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListEntry {
    pub id: String,
    pub name: String,
    pub detail: String,
    pub year: i32,
    pub score: Option<f32>,
    pub selected: bool,
}

pub struct Session {
    network: Network,
    filter: ViewFilter,
    mode: LayoutMode,
    matches: Option<ActiveMatch>,
    selected: Option<String>,
    viewport: Viewport,
    physics: PhysicsConfig,
    view: WorkingView,
    pins: Vec<Pin>,
    styles: Vec<NodeStyle>,
    simulation: Simulation,
    dragging: Option<usize>,
    revision: u64,
    applied_ticket: u64,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl Session {
    pub fn new(
        network: Network,
        mode: LayoutMode,
        viewport: Viewport,
        physics: PhysicsConfig,
    ) -> Self {
        let filter = ViewFilter::All;
        let view = compute_working_view(&network, &filter);
        let pins = apply_layout(mode, &view.nodes, viewport);
        let styles = derive_styles(&view.nodes, None);
        let simulation = Simulation::new(&view, &pins, viewport, physics);

        Self {
            network,
            filter,
            mode,
            matches: None,
            selected: None,
            viewport,
            physics,
            view,
            pins,
            styles,
            simulation,
            dragging: None,
            revision: 0,
            applied_ticket: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn view(&self) -> &WorkingView {
        &self.view
    }

    pub fn styles(&self) -> &[NodeStyle] {
        &self.styles
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn active_match(&self) -> Option<&ActiveMatch> {
        self.matches.as_ref()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.network.node(id))
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: SessionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn rebuild(&mut self) {
        if self.dragging.take().is_some() {
            self.simulation.end_interaction();
        }

        let view = compute_working_view(&self.network, &self.filter);
        let pins = apply_layout(self.mode, &view.nodes, self.viewport);
        let styles = derive_styles(&view.nodes, self.matches.as_ref().map(|active| &active.map));

        if view.same_population(&self.view) {
            self.simulation.relayout(&pins, self.viewport);
        } else {
            log::debug!(
                "re-seeding simulation: {} -> {} nodes",
                self.view.node_count(),
                view.node_count()
            );
            self.simulation = Simulation::new(&view, &pins, self.viewport, self.physics);
        }

        self.view = view;
        self.pins = pins;
        self.styles = styles;
        self.revision = self.revision.wrapping_add(1);

        let event = SessionEvent::ViewRebuilt {
            revision: self.revision,
            node_count: self.view.node_count(),
        };
        self.publish(event);
    }

    pub fn set_filter(&mut self, filter: ViewFilter) {
        if filter == self.filter {
            return;
        }
        log::info!("filter: {}", filter.label());
        self.filter = filter;
        self.rebuild();
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if mode == self.mode {
            return;
        }
        log::info!("layout mode: {mode}");
        self.mode = mode;
        self.rebuild();
    }

    pub fn resize(&mut self, viewport: Viewport) {
        let unchanged = (viewport.width - self.viewport.width).abs() < 0.5
            && (viewport.height - self.viewport.height).abs() < 0.5;
        if unchanged {
            return;
        }
        self.viewport = viewport;
        self.rebuild();
    }

    pub fn reheat(&mut self) {
        self.simulation.reheat();
    }

    pub fn set_physics(&mut self, physics: PhysicsConfig) {
        self.physics = physics;
        self.simulation.set_config(physics);
    }

    /// The filter is re-evaluated against the current canonical set, so a
    /// result computed for an older view applies cleanly.
    pub fn apply_match_result(&mut self, query: &str, result: MatchResult) {
        let map = MatchMap::from_result(&result);
        self.filter = ViewFilter::ByMatchSet(result.ids());
        self.matches = Some(ActiveMatch {
            query: query.to_owned(),
            result,
            map,
        });
        self.rebuild();
    }

    pub fn clear_match(&mut self) {
        if self.matches.is_none() && self.filter == ViewFilter::All {
            return;
        }
        self.matches = None;
        self.filter = ViewFilter::All;
        self.rebuild();
    }

    /// Applies a finished query. Replies older than the last applied one are
    /// dropped; failures leave the view and selection untouched.
    pub fn apply_query_outcome(
        &mut self,
        ticket: u64,
        query: &str,
        outcome: Result<MatchResult, QueryError>,
    ) -> QueryStatus {
        if ticket < self.applied_ticket {
            log::debug!("dropping stale query reply #{ticket}");
            return QueryStatus::Stale;
        }

        match outcome {
            Ok(result) => {
                self.applied_ticket = ticket;
                self.apply_match_result(query, result);
                let matched = self.view.node_count() - 1;
                log::info!("query #{ticket} matched {matched} connection(s)");
                QueryStatus::Applied { matched }
            }
            Err(error) if error.is_transient() => {
                if error.is_rate_limited() {
                    log::warn!("query #{ticket} was rate limited");
                } else {
                    log::warn!("query #{ticket}: {error}");
                }
                QueryStatus::Transient(error.to_string())
            }
            Err(error) => {
                log::warn!("query #{ticket} failed: {error}");
                QueryStatus::Failed(error.to_string())
            }
        }
    }

    /// Unknown ids leave the current selection as it is.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id
            && !self.network.contains(id)
        {
            return false;
        }
        let next = id.map(str::to_owned);
        if next == self.selected {
            return false;
        }
        self.selected = next;
        let event = SessionEvent::SelectionChanged(self.selected.clone());
        self.publish(event);
        true
    }

    pub fn drag_start(&mut self, id: &str, position: Vec2) -> bool {
        let Some(index) = self.view.index_of(id) else {
            return false;
        };
        self.dragging = Some(index);
        self.simulation.set_pin(index, Pin::at(position.x, position.y));
        self.simulation.begin_interaction();
        true
    }

    pub fn drag_move(&mut self, position: Vec2) {
        if let Some(index) = self.dragging {
            self.simulation.set_pin(index, Pin::at(position.x, position.y));
        }
    }

    /// Time runs down the y-axis in every mode, so only the vertical layout
    /// pin comes back and the horizontal axis is left free. The owner keeps
    /// its pin.
    pub fn drag_end(&mut self) {
        let Some(index) = self.dragging.take() else {
            return;
        };
        self.simulation.end_interaction();

        if index == WorkingView::OWNER_INDEX {
            return;
        }

        let layout_pin = self.pins.get(index).copied().unwrap_or_default();
        let released = Pin {
            fx: None,
            fy: layout_pin.fy,
        };
        self.simulation.set_pin(index, released);
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging
            .and_then(|index| self.view.nodes.get(index))
            .map(|node| node.id.as_str())
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            revision: self.revision,
            positions: self.simulation.positions().into(),
        }
    }

    /// Advances the simulation by one step and publishes the new positions.
    pub fn tick(&mut self) -> bool {
        if !self.simulation.step() {
            return false;
        }
        if !self.subscribers.is_empty() {
            let snapshot = self.snapshot();
            self.publish(SessionEvent::Positions(snapshot));
        }
        true
    }

    pub fn list_entries(&self) -> Vec<ListEntry> {
        let mut entries = self
            .view
            .nodes
            .iter()
            .zip(&self.styles)
            .filter(|(node, _)| !node.is_owner())
            .map(|(node, style)| ListEntry {
                id: node.id.clone(),
                name: node.display_name().to_owned(),
                detail: node.headline(),
                year: node.year(),
                score: style.match_score,
                selected: self.is_selected(&node.id),
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Match;
    use crate::network::OWNER_ID;
    use crate::network::fixtures::network_of;
    use crate::view::TimeScale;

    fn session(dates: &[&str], mode: LayoutMode) -> Session {
        Session::new(
            network_of(dates),
            mode,
            Viewport::new(1000.0, 800.0),
            PhysicsConfig::default(),
        )
    }

    fn result_for(ids: &[&str]) -> MatchResult {
        MatchResult {
            explanation: "test".to_owned(),
            matches: ids
                .iter()
                .map(|id| Match {
                    id: (*id).to_owned(),
                    name: String::new(),
                    score: 80.0,
                    reason: String::new(),
                    aspect: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_year_filter_scenario() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        session.set_filter(ViewFilter::ByYear(2021));

        let view = session.view();
        assert_eq!(view.node_count() - 1, 2);
        assert!(view.nodes[1..].iter().all(|node| node.year() == 2021));
        assert_eq!(view.edges.len(), 2);
        assert_eq!(session.simulation().len(), 3);
    }

    #[test]
    fn test_match_scenario() {
        let mut session = session(
            &["01 Jan 2018", "01 Jan 2019", "01 Jan 2020", "01 Jan 2021"],
            LayoutMode::Organic,
        );
        let status = session.apply_query_outcome(1, "mentors", Ok(result_for(&["p_0"])));

        assert_eq!(status, QueryStatus::Applied { matched: 1 });
        let ids = session.view().nodes.iter().map(|node| node.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec![OWNER_ID, "p_0"]);
        assert_eq!(session.view().edges.len(), 1);
        assert_eq!(session.styles()[1].match_score, Some(80.0));
    }

    #[test]
    fn test_failed_query_leaves_state_alone() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        session.set_filter(ViewFilter::ByYear(2021));
        assert!(session.select(Some("p_1")));
        let revision = session.revision();

        let status = session.apply_query_outcome(
            1,
            "anything",
            Err(QueryError::Parse("no JSON object found".to_owned())),
        );

        assert!(matches!(status, QueryStatus::Failed(_)));
        assert_eq!(session.revision(), revision);
        assert_eq!(session.filter(), &ViewFilter::ByYear(2021));
        assert_eq!(session.selected(), Some("p_1"));
        assert!(session.active_match().is_none());
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let mut session = session(&["14 Mar 2020"], LayoutMode::Timeline);
        let status = session.apply_query_outcome(
            1,
            "anything",
            Err(QueryError::RateLimited {
                provider: "Claude".to_owned(),
            }),
        );
        assert!(matches!(status, QueryStatus::Transient(_)));
    }

    #[test]
    fn test_stale_reply_is_discarded() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        session.apply_query_outcome(2, "newer", Ok(result_for(&["p_2"])));
        let status = session.apply_query_outcome(1, "older", Ok(result_for(&["p_0", "p_1"])));

        assert_eq!(status, QueryStatus::Stale);
        assert_eq!(session.active_match().map(|active| active.query.as_str()), Some("newer"));
        assert_eq!(session.view().node_count(), 2);
    }

    #[test]
    fn test_drag_release_in_organic_keeps_time_axis() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Organic);
        let scale = TimeScale::from_nodes(&session.view().nodes, session.viewport());
        let expected_y = scale.map(session.view().nodes[2].connected);

        assert!(session.drag_start("p_1", Vec2::new(120.0, 30.0)));
        session.drag_move(Vec2::new(140.0, 45.0));
        session.tick();
        assert_eq!(session.simulation().nodes()[2].position, Vec2::new(140.0, 45.0));
        session.drag_end();

        let node = &session.simulation().nodes()[2];
        assert_eq!(node.pin.fy, Some(expected_y));
        assert_eq!(node.pin.fx, None);
        assert_eq!(node.position.y, expected_y);
        session.tick();
        assert_eq!(session.simulation().nodes()[2].position.y, expected_y);
    }

    #[test]
    fn test_owner_drag_keeps_pin() {
        let mut session = session(&["14 Mar 2020"], LayoutMode::Timeline);
        session.drag_start(OWNER_ID, Vec2::new(10.0, 20.0));
        session.drag_end();
        assert_eq!(session.simulation().nodes()[0].pin, Pin::at(10.0, 20.0));
        assert!(session.dragging().is_none());
    }

    #[test]
    fn test_mode_round_trip_restores_pins() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        let original = session.pins().to_vec();
        session.set_layout_mode(LayoutMode::Organic);
        assert_ne!(session.pins(), original.as_slice());
        assert!(session.pins()[1..].iter().all(|pin| pin.fx.is_none()));
        session.set_layout_mode(LayoutMode::Timeline);
        assert_eq!(session.pins(), original.as_slice());
    }

    #[test]
    fn test_star_invariant_for_every_filter_and_mode() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        let filters = [
            ViewFilter::All,
            ViewFilter::ByYear(2020),
            ViewFilter::ByYear(2030),
            ViewFilter::ByMatchSet(["p_2".to_owned()].into()),
        ];
        for mode in LayoutMode::ALL {
            session.set_layout_mode(mode);
            for filter in filters.clone() {
                session.set_filter(filter);
                let view = session.view();
                assert_eq!(view.edges.len(), view.node_count() - 1);
                assert_eq!(view.nodes[0].id, OWNER_ID);
                assert_eq!(session.pins().len(), view.node_count());
                assert_eq!(session.styles().len(), view.node_count());
                assert_eq!(session.simulation().len(), view.node_count());
            }
        }
    }

    #[test]
    fn test_resize_reruns_layout() {
        let mut session = session(&["14 Mar 2020"], LayoutMode::Timeline);
        session.resize(Viewport::new(400.0, 300.0));
        assert_eq!(session.pins()[0], Pin::at(200.0, 150.0));
        assert_eq!(session.simulation().nodes()[0].position, Vec2::new(200.0, 150.0));
    }

    #[test]
    fn test_list_is_sorted_and_tracks_selection() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        session.select(Some("p_2"));

        let entries = session.list_entries();
        let names = entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Person0 Test", "Person1 Test", "Person2 Test"]);
        assert_eq!(
            entries.iter().filter(|entry| entry.selected).map(|entry| entry.id.as_str()).collect::<Vec<_>>(),
            vec!["p_2"]
        );

        session.set_filter(ViewFilter::ByYear(2020));
        let entries = session.list_entries();
        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|entry| !entry.selected));
    }

    #[test]
    fn test_select_ignores_unknown_ids() {
        let mut session = session(&["14 Mar 2020"], LayoutMode::Timeline);
        assert!(session.select(Some("p_0")));
        assert!(!session.select(Some("ghost")));
        assert_eq!(session.selected(), Some("p_0"));
        assert!(session.select(None));
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_subscribers_receive_events() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021"], LayoutMode::Organic);
        let rx = session.subscribe();

        session.set_filter(ViewFilter::ByYear(2021));
        session.select(Some("p_1"));
        session.tick();

        let events = rx.try_iter().collect::<Vec<_>>();
        assert!(matches!(events[0], SessionEvent::ViewRebuilt { node_count: 2, .. }));
        assert!(matches!(&events[1], SessionEvent::SelectionChanged(Some(id)) if id == "p_1"));
        assert!(matches!(&events[2], SessionEvent::Positions(snapshot) if snapshot.positions.len() == 2));

        drop(rx);
        session.tick();
        assert!(session.subscribers.is_empty());
    }

    #[test]
    fn test_population_change_reseeds_simulation() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Organic);
        for _ in 0..100 {
            session.tick();
        }
        session.set_filter(ViewFilter::ByYear(2021));
        assert_eq!(session.simulation().alpha(), 1.0);
        assert!(session.simulation().nodes().iter().all(|node| node.velocity == Vec2::ZERO));
    }

    #[test]
    fn test_physics_change_keeps_positions() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021"], LayoutMode::Organic);
        for _ in 0..50 {
            session.tick();
        }
        let before = session.simulation().positions();
        session.set_physics(PhysicsConfig {
            node_charge: 400.0,
            ..PhysicsConfig::default()
        });
        assert_eq!(session.simulation().positions(), before);
        assert_eq!(session.simulation().alpha(), 1.0);
    }

    #[test]
    fn test_rebuild_mid_drag_lets_simulation_cool() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Organic);
        assert!(session.drag_start("p_1", Vec2::new(120.0, 30.0)));
        session.set_layout_mode(LayoutMode::Timeline);
        assert!(session.dragging().is_none());
        session.drag_end();

        let mut steps = 0;
        while session.tick() {
            steps += 1;
            assert!(steps < 5_000, "simulation stayed warm at alpha {}", session.simulation().alpha());
        }
        assert!(!session.simulation().is_active());
    }

    #[test]
    fn test_drag_release_restores_time_pin_in_pinned_modes() {
        for mode in [LayoutMode::Timeline, LayoutMode::Clustered] {
            let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], mode);
            let layout_pin = session.pins()[3];
            assert!(layout_pin.fx.is_some());

            assert!(session.drag_start("p_2", Vec2::new(50.0, 70.0)));
            session.drag_move(Vec2::new(60.0, 90.0));
            session.drag_end();

            let node = &session.simulation().nodes()[3];
            assert_eq!(node.pin.fy, layout_pin.fy, "{mode}");
            assert_eq!(node.pin.fx, None, "{mode}");
            assert_eq!(Some(node.position.y), layout_pin.fy, "{mode}");
        }
    }

    #[test]
    fn test_unknown_match_ids_ignore_active_filter() {
        let mut session = session(&["14 Mar 2020", "02 Jan 2021", "09 Sep 2021"], LayoutMode::Timeline);
        session.apply_match_result("q", result_for(&["p_0", "p_2", "ghost"]));
        session.set_filter(ViewFilter::ByYear(2020));

        let active = session.active_match().unwrap();
        assert_eq!(session.view().node_count(), 2);
        assert_eq!(active.unknown_ids(session.network()), 1);
    }
}
