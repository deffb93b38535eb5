//! Monitors: tag sets, bar placement, geometry discovery and the
//! arrangement driver.

use {
    crate::{
        backend::WindowHandle,
        client::ClientId,
        layout::{self, LayoutKind, LayoutParams},
        rect::Rect,
        seat::SeatId,
        state::Wm,
    },
    smallvec::SmallVec,
};

arena_ids!(MonitorId);

pub struct Monitor {
    /// Protocol screen number. Swapped along with geometry by the pinned
    /// monitor content swap.
    pub num: i32,
    /// Full screen rectangle.
    pub dim: Rect,
    /// Usable rectangle with the bar strip subtracted.
    pub area: Rect,
    pub bar_y: i32,
    pub show_bar: bool,
    pub top_bar: bool,
    pub bar_win: Option<WindowHandle>,

    pub mfact: f64,
    pub nmaster: i32,
    pub rmaster: bool,

    /// Current and alternate tag set; `sel_tags` picks the live one.
    pub tagset: [u32; 2],
    pub sel_tags: usize,
    /// Two layout slots toggled by the layout command.
    pub layouts: [LayoutKind; 2],
    pub sel_layout: usize,
    pub layout_symbol: String,

    /// Client order list; the head is the zoom target.
    pub clients: Vec<ClientId>,
    /// Focus recency, most recent first.
    pub stack: Vec<ClientId>,
    /// Seats currently selecting this monitor, selection order.
    pub seats: SmallVec<[SeatId; 2]>,

    pub arranging: bool,
}

impl Monitor {
    pub fn new(config: &crate::config::Config) -> Self {
        Self {
            num: 0,
            dim: Rect::default(),
            area: Rect::default(),
            bar_y: 0,
            show_bar: config.show_bar,
            top_bar: config.top_bar,
            bar_win: None,
            mfact: config.mfact,
            nmaster: config.nmaster,
            rmaster: config.rmaster,
            tagset: [1, 1],
            sel_tags: 0,
            layouts: [LayoutKind::Tile, LayoutKind::Floating],
            sel_layout: 0,
            layout_symbol: LayoutKind::Tile.symbol().to_string(),
            clients: Vec::new(),
            stack: Vec::new(),
            seats: SmallVec::new(),
            arranging: false,
        }
    }

    pub fn layout(&self) -> LayoutKind {
        self.layouts[self.sel_layout]
    }

    pub fn shows(&self, tags: u32) -> bool {
        tags & self.tagset[self.sel_tags] != 0
    }

    /// Area used for pointer-to-monitor attribution. Extends over the bar
    /// strip so a pointer resting on the bar still resolves to this monitor.
    pub fn catchment(&self, bar_height: i32) -> Rect {
        if !self.show_bar {
            return self.area;
        }
        if self.top_bar {
            Rect::new(
                self.area.x(),
                self.area.y() - bar_height,
                self.area.width(),
                self.area.height() + bar_height,
            )
        } else {
            Rect::new(
                self.area.x(),
                self.area.y(),
                self.area.width(),
                self.area.height() + bar_height,
            )
        }
    }
}

impl Wm {
    /// Fold the bar strip into the monitor's usable area.
    pub fn update_bar_pos(&mut self, monitor: MonitorId) {
        let bar_height = self.bar_height;
        let Some(m) = self.monitors.get_mut(monitor) else {
            return;
        };
        let mut area = m.dim;
        if m.show_bar {
            area = area.with_size(area.width(), area.height() - bar_height);
            if m.top_bar {
                m.bar_y = m.dim.y();
                area = area.at(area.x(), m.dim.y() + bar_height);
            } else {
                m.bar_y = m.dim.y() + area.height();
            }
        } else {
            m.bar_y = -bar_height;
        }
        m.area = area;
    }

    pub fn move_bar(&mut self, monitor: MonitorId) {
        let bar_height = self.bar_height;
        let Some(m) = self.monitors.get(monitor) else {
            return;
        };
        if let Some(bar) = m.bar_win {
            let (x, y, w) = (m.area.x(), m.bar_y, m.area.width());
            self.display.move_resize_bar(bar, x, y, w, bar_height);
        }
    }

    pub fn bars_dirty(&mut self) {
        for &id in &self.mon_order {
            if let Some(m) = self.monitors.get(id) {
                self.display.bar_dirty(m.num);
            }
        }
    }

    /// Reconcile the monitor list with the display server's screens.
    /// Returns true when any geometry changed.
    pub fn update_geometry(&mut self, seat: Option<SeatId>) -> bool {
        let mut screens = Vec::new();
        for s in self.display.screens() {
            if !screens.contains(&s) {
                screens.push(s);
            }
        }
        if screens.is_empty() {
            screens.push(Rect::new(0, 0, self.screen_w, self.screen_h));
        }
        let mut dirty = false;
        let known = self.mon_order.len();
        for _ in known..screens.len() {
            let m = self.monitors.insert(Monitor::new(&self.config));
            self.mon_order.push(m);
        }
        for (i, &screen) in screens.iter().enumerate() {
            let id = self.mon_order[i];
            let Some(m) = self.monitors.get_mut(id) else {
                continue;
            };
            if i >= known || m.dim != screen {
                dirty = true;
                m.num = i as i32;
                m.dim = screen;
                m.area = screen;
                self.update_bar_pos(id);
                self.move_bar(id);
            }
        }
        while self.mon_order.len() > screens.len() {
            dirty = true;
            let dead = self.mon_order[self.mon_order.len() - 1];
            self.retire_monitor(dead);
        }
        if dirty {
            if let Some(seat) = seat {
                if let Some(first) = self.first_monitor() {
                    self.select_monitor(seat, first);
                }
            }
        }
        dirty
    }

    /// Drop a monitor: its clients move to the first monitor and any seat
    /// selecting it re-selects.
    fn retire_monitor(&mut self, dead: MonitorId) {
        let Some(first) = self.mon_order.first().copied().filter(|&m| m != dead) else {
            return;
        };
        let orphans = self
            .monitors
            .get(dead)
            .map(|m| m.clients.clone())
            .unwrap_or_default();
        for client in orphans {
            self.detach(client);
            self.detach_stack(client);
            if let Some(c) = self.clients.get_mut(client) {
                c.monitor = first;
            }
            self.attach(client);
            self.attach_stack(client);
        }
        for seat in self.seats.ids() {
            if self.seats.get(seat).and_then(|s| s.sel_monitor) == Some(dead) {
                self.select_monitor(seat, first);
            }
        }
        if self.pinned == Some(dead) {
            self.pinned = Some(first);
        }
        self.mon_order.retain(|&m| m != dead);
        self.monitors.remove(dead);
    }

    /// Re-apply the current layout. `None` arranges every monitor. Events
    /// that arrive while windows shuffle are replayed afterwards so focus
    /// tracking sees a settled tree.
    pub fn arrange(&mut self, monitor: Option<MonitorId>) {
        match monitor {
            Some(m) => self.arrange_one(m),
            None => {
                for m in self.mon_order.clone() {
                    self.arrange_one(m);
                }
            }
        }
    }

    fn arrange_one(&mut self, monitor: MonitorId) {
        {
            let Some(m) = self.monitors.get_mut(monitor) else {
                return;
            };
            if m.arranging {
                return;
            }
            m.arranging = true;
        }
        self.show_hide(monitor);
        self.arrange_monitor(monitor);
        let backlog = self.display.drain_events();
        for event in backlog {
            self.dispatch(event);
        }
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.arranging = false;
        }
    }

    /// Move visible clients into place top-down and park hidden ones
    /// off-screen bottom-up.
    fn show_hide(&mut self, monitor: MonitorId) {
        let Some(m) = self.monitors.get(monitor) else {
            return;
        };
        let stack = m.stack.clone();
        let arranges = m.layout().arranges();
        let shows = m.tagset[m.sel_tags];
        for &client in &stack {
            let Some(c) = self.clients.get(client) else {
                continue;
            };
            if c.tags & shows == 0 {
                continue;
            }
            let (win, geom, floating, fullscreen) =
                (c.window, c.geom, c.floating, c.fullscreen);
            self.display.move_window(win, geom.x(), geom.y());
            if !arranges || floating {
                self.resize(client, geom, false);
                if fullscreen {
                    self.set_fullscreen(client, true);
                }
            }
        }
        for &client in stack.iter().rev() {
            let Some(c) = self.clients.get(client) else {
                continue;
            };
            if c.tags & shows != 0 {
                continue;
            }
            let (win, y, width) = (c.window, c.geom.y(), c.total_width());
            self.display.move_window(win, -2 * width, y);
        }
    }

    fn arrange_monitor(&mut self, monitor: MonitorId) {
        let Some(m) = self.monitors.get(monitor) else {
            return;
        };
        let kind = m.layout();
        let shows = m.tagset[m.sel_tags];
        let visible = m
            .clients
            .iter()
            .filter(|&&c| self.clients.get(c).is_some_and(|c| c.tags & shows != 0))
            .count();
        let mut slots = Vec::new();
        for &client in &m.clients {
            let Some(c) = self.clients.get(client) else {
                continue;
            };
            if c.floating || c.tags & shows == 0 {
                continue;
            }
            slots.push((client, c.border));
        }
        let params = LayoutParams {
            area: m.area,
            nmaster: m.nmaster,
            mfact: m.mfact,
            rmaster: m.rmaster,
            gap: self.config.gap_px,
        };
        let symbol = if kind == LayoutKind::Monocle && visible > 0 {
            layout::monocle_symbol(visible)
        } else {
            kind.symbol().to_string()
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.layout_symbol = symbol;
        }
        if kind.arranges() {
            for (client, rect) in layout::arrange(kind, &params, &slots) {
                self.resize(client, rect, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        crate::{layout::LayoutKind, rect::Rect, test_fixture::TestWm},
        smallvec::SmallVec,
    };

    #[test]
    fn tiled_clients_get_layout_rects() {
        let mut t = TestWm::with_monitors(1);
        let mon = t.monitor(0);
        {
            let m = t.wm.monitors.get_mut(mon).unwrap();
            m.mfact = 0.6;
            m.show_bar = false;
        }
        t.wm.config.border_px = 0;
        t.wm.update_bar_pos(mon);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let c = t.add_window(3);
        t.wm.arrange(Some(mon));
        // Order list is most-recent-first, so c is the master.
        let area = t.wm.monitors.get(mon).unwrap().area;
        assert_eq!(area, Rect::new(0, 0, 1000, 800));
        assert_eq!(t.wm.clients.get(c).unwrap().geom, Rect::new(0, 0, 600, 800));
        assert_eq!(t.wm.clients.get(b).unwrap().geom, Rect::new(600, 0, 400, 400));
        assert_eq!(
            t.wm.clients.get(a).unwrap().geom,
            Rect::new(600, 400, 400, 400)
        );
    }

    #[test]
    fn monocle_symbol_counts_visible_clients() {
        let mut t = TestWm::with_monitors(1);
        let mon = t.monitor(0);
        t.add_window(1);
        t.add_window(2);
        t.wm.monitors.get_mut(mon).unwrap().layouts[0] = LayoutKind::Monocle;
        t.wm.arrange(Some(mon));
        assert_eq!(t.wm.monitors.get(mon).unwrap().layout_symbol, "[2]");
    }

    #[test]
    fn hidden_clients_move_off_screen() {
        let mut t = TestWm::with_monitors(1);
        let mon = t.monitor(0);
        let a = t.add_window(1);
        // View a tag the client is not on.
        let seat = t.seat(0);
        t.wm.view(seat, 1 << 3);
        let m = t.wm.monitors.get(mon).unwrap();
        assert!(!m.shows(t.wm.clients.get(a).unwrap().tags));
        let win = t.wm.clients.get(a).unwrap().window;
        assert!(t.rec().moved_off_screen(win));
    }

    #[test]
    fn monitor_removal_reparents_clients() {
        let mut t = TestWm::with_monitors(2);
        let seat = t.seat(0);
        let m1 = t.monitor(1);
        t.wm.select_monitor(seat, m1);
        let c = t.add_window(1);
        assert_eq!(t.wm.clients.get(c).unwrap().monitor, m1);
        t.shrink_to_one_screen();
        t.wm.update_geometry(None);
        let first = t.monitor(0);
        assert_eq!(t.wm.clients.get(c).unwrap().monitor, first);
        assert!(!t.wm.monitors.contains(m1));
        let sel: SmallVec<[_; 2]> = t.wm.monitors.get(first).unwrap().seats.clone();
        assert!(sel.contains(&seat));
    }
}
