//! Seat commands. The transport's key and button bindings resolve to
//! [`Command`] values; every command acts on the seat whose device fired it.

use {
    crate::{
        client::{ClientId, WindowKind},
        layout::LayoutKind,
        seat::SeatId,
        state::Wm,
    },
    std::cmp::max,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    Quit,
    /// Move seat focus to the monitor in a horizontal direction. Positive is
    /// left, negative is right.
    FocusMonitor(i32),
    /// Swap the selected monitor's contents with a neighbor's.
    SwapMonitor(i32),
    /// Focus the next (positive) or previous visible client in order.
    FocusStack(i32),
    /// Like `FocusStack`, but rotates the client order along with focus.
    CycleStack(i32),
    IncNMaster(i32),
    KillClient,
    /// Start a pointer move drag on the seat's selection.
    MoveMouse,
    /// Start a pointer resize drag on the seat's selection.
    ResizeMouse,
    /// Select a layout, or toggle back to the previous one when `None` or
    /// already selected.
    SetLayout(Option<LayoutKind>),
    /// Adjust the master area factor. Values below 1.0 are relative, higher
    /// values set `arg - 1.0` absolutely.
    SetMasterFactor(f64),
    /// Move the selection to exactly these tags.
    Tag(u32),
    ToggleTag(u32),
    /// View exactly these tags on the selected monitor.
    View(u32),
    ToggleView(u32),
    ToggleBar,
    ToggleFloating,
    ToggleFullscreen,
    /// Pin the seat to its current monitor, or unpin.
    TogglePin,
    ToggleRightMaster,
    /// Toggle per-client button grabs for the selection.
    ToggleMouseGrabs,
    /// Promote the selection to master, or the next tiled client when it
    /// already is the master.
    Zoom,
}

impl Wm {
    pub fn run_command(&mut self, seat: SeatId, command: Command) {
        log::debug!("command {:?}", command);
        match command {
            Command::Quit => self.quit(),
            Command::FocusMonitor(dir) => self.focus_monitor(seat, dir),
            Command::SwapMonitor(dir) => self.swap_monitor(seat, dir),
            Command::FocusStack(dir) => self.focus_stack(seat, dir),
            Command::CycleStack(dir) => self.cycle_stack(seat, dir),
            Command::IncNMaster(delta) => self.inc_nmaster(seat, delta),
            Command::KillClient => self.kill_client(seat),
            Command::MoveMouse => self.start_move(seat),
            Command::ResizeMouse => self.start_resize(seat),
            Command::SetLayout(kind) => self.set_layout(seat, kind),
            Command::SetMasterFactor(f) => self.set_master_factor(seat, f),
            Command::Tag(tags) => self.tag(seat, tags),
            Command::ToggleTag(tags) => self.toggle_tag(seat, tags),
            Command::View(tags) => self.view(seat, tags),
            Command::ToggleView(tags) => self.toggle_view(seat, tags),
            Command::ToggleBar => self.toggle_bar(seat),
            Command::ToggleFloating => self.toggle_floating(seat),
            Command::ToggleFullscreen => self.toggle_fullscreen(seat),
            Command::TogglePin => self.toggle_pin(seat),
            Command::ToggleRightMaster => self.toggle_rmaster(seat),
            Command::ToggleMouseGrabs => self.toggle_mouse_grabs(seat),
            Command::Zoom => self.zoom(seat),
        }
    }

    fn focus_monitor(&mut self, seat: SeatId, dir: i32) {
        if self.mon_order.len() < 2 {
            return;
        }
        let Some(target) = self.dir_to_mon(seat, dir) else {
            return;
        };
        if self.seats.get(seat).and_then(|s| s.sel_monitor) == Some(target) {
            return;
        }
        self.unfocus(seat, false);
        self.select_monitor(seat, target);
        self.focus(seat, None);
    }

    fn swap_monitor(&mut self, seat: SeatId, dir: i32) {
        if self.mon_order.len() < 2 {
            return;
        }
        let Some(target) = self.dir_to_mon(seat, dir) else {
            return;
        };
        let Some(current) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        if target == current {
            return;
        }
        self.unfocus(seat, false);
        self.swap_monitor_places(current, target);
        self.update_bar_pos(current);
        self.update_bar_pos(target);
        self.move_bar(current);
        self.move_bar(target);
        if self.pinned.is_some() {
            self.pinned = Some(target);
        }
        self.select_monitor(seat, target);
        self.focus(seat, None);
        self.arrange(Some(target));
        self.arrange(Some(current));
    }

    fn focus_stack(&mut self, seat: SeatId, dir: i32) {
        let Some(target) = self.stack_neighbor(seat, dir) else {
            return;
        };
        self.focus(seat, Some(target));
    }

    fn cycle_stack(&mut self, seat: SeatId, dir: i32) {
        if self.stack_neighbor(seat, dir).is_none() {
            return;
        }
        self.focus_stack(seat, dir);
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        let (head, tail) = {
            let Some(m) = self.monitors.get(monitor) else {
                return;
            };
            (m.clients.first().copied(), m.clients.last().copied())
        };
        if dir > 0 {
            if let Some(c) = head {
                self.detach(c);
                self.attach_end(c);
            }
        } else if let Some(c) = tail {
            self.detach(c);
            self.attach(c);
        }
        self.arrange(Some(monitor));
    }

    /// The visible client `dir` steps away from the selection in client
    /// order, wrapping. `None` when the seat has no eligible selection.
    fn stack_neighbor(&self, seat: SeatId, dir: i32) -> Option<ClientId> {
        let s = self.seats.get(seat)?;
        let sel = s.focus?;
        let monitor = s.sel_monitor?;
        if self.config.lock_fullscreen && self.clients.get(sel).is_some_and(|c| c.fullscreen) {
            return None;
        }
        let m = self.monitors.get(monitor)?;
        let visible = |&c: &ClientId| {
            self.clients
                .get(c)
                .is_some_and(|cl| m.shows(cl.tags))
        };
        let idx = m.clients.iter().position(|&c| c == sel)?;
        if dir > 0 {
            m.clients[idx + 1..]
                .iter()
                .find(|&c| visible(c))
                .or_else(|| m.clients.iter().find(|&c| visible(c)))
                .copied()
        } else {
            m.clients[..idx]
                .iter()
                .rev()
                .find(|&c| visible(c))
                .or_else(|| m.clients[idx..].iter().rev().find(|&c| visible(c)))
                .copied()
        }
    }

    fn inc_nmaster(&mut self, seat: SeatId, delta: i32) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.nmaster = max(m.nmaster + delta, 0);
        }
        self.arrange(Some(monitor));
    }

    fn kill_client(&mut self, seat: SeatId) {
        let Some(window) = self
            .seats
            .get(seat)
            .and_then(|s| s.focus)
            .and_then(|c| self.clients.get(c))
            .map(|c| c.window)
        else {
            return;
        };
        if !self.display.request_close(window) {
            self.display.kill_window(window);
        }
    }

    /// Arm a move drag on the seat's pointer. Re-entered on button release
    /// when a resize drag was held at the same time.
    pub fn start_move(&mut self, seat: SeatId) {
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let Some(client) = s.move_drag.client.or(s.focus) else {
            return;
        };
        let Some(ptr) = s.pointer else {
            return;
        };
        if s.resize_drag.client.is_some() {
            self.display.ungrab_pointer(ptr);
        }
        if !self
            .display
            .grab_pointer(ptr, crate::backend::CursorKind::Move)
        {
            return;
        }
        let Some(geom) = self.clients.get(client).map(|c| c.geom) else {
            return;
        };
        let pos = self.display.pointer_position(ptr).unwrap_or((0, 0));
        let Some(s) = self.seats.get_mut(seat) else {
            return;
        };
        s.move_drag.client = Some(client);
        s.move_drag.time = s.last_event_time;
        s.move_drag.button = s.last_button;
        s.move_drag.ox = geom.x();
        s.move_drag.oy = geom.y();
        s.move_drag.x = pos.0;
        s.move_drag.y = pos.1;
    }

    /// Arm a resize drag. Fullscreen windows cannot be resized by pointer.
    pub fn start_resize(&mut self, seat: SeatId) {
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let Some(client) = s.resize_drag.client.or(s.focus) else {
            return;
        };
        let Some(ptr) = s.pointer else {
            return;
        };
        let Some(c) = self.clients.get(client) else {
            return;
        };
        if c.fullscreen {
            return;
        }
        let (geom, border) = (c.geom, c.border);
        if s.move_drag.client.is_some() {
            self.display.ungrab_pointer(ptr);
        }
        if !self
            .display
            .grab_pointer(ptr, crate::backend::CursorKind::Resize)
        {
            return;
        }
        let Some(s) = self.seats.get_mut(seat) else {
            return;
        };
        s.resize_drag.client = Some(client);
        s.resize_drag.time = s.last_event_time;
        s.resize_drag.button = s.last_button;
        s.resize_drag.ox = geom.x();
        s.resize_drag.oy = geom.y();
        s.resize_drag.x = geom.width() + border - 1;
        s.resize_drag.y = geom.height() + border - 1;
    }

    fn set_layout(&mut self, seat: SeatId, kind: Option<LayoutKind>) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        {
            let Some(m) = self.monitors.get_mut(monitor) else {
                return;
            };
            if kind.is_none() || kind != Some(m.layouts[m.sel_layout]) {
                m.sel_layout ^= 1;
            }
            if let Some(kind) = kind {
                m.layouts[m.sel_layout] = kind;
            }
            m.layout_symbol = m.layouts[m.sel_layout].symbol().to_string();
        }
        if self.seats.get(seat).is_some_and(|s| s.focus.is_some()) {
            self.arrange(Some(monitor));
        } else {
            self.bars_dirty();
        }
    }

    fn set_master_factor(&mut self, seat: SeatId, factor: f64) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        let Some(m) = self.monitors.get_mut(monitor) else {
            return;
        };
        if !m.layout().arranges() {
            return;
        }
        let f = if factor < 1.0 {
            factor + m.mfact
        } else {
            factor - 1.0
        };
        if !(0.1..=0.9).contains(&f) {
            return;
        }
        m.mfact = f;
        self.arrange(Some(monitor));
    }

    fn tag(&mut self, seat: SeatId, tags: u32) {
        let tags = tags & self.config.tag_mask();
        if tags == 0 {
            return;
        }
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let (Some(sel), Some(monitor)) = (s.focus, s.sel_monitor) else {
            return;
        };
        if let Some(c) = self.clients.get_mut(sel) {
            c.tags = tags;
        }
        self.focus(seat, None);
        self.arrange(Some(monitor));
    }

    fn toggle_tag(&mut self, seat: SeatId, tags: u32) {
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let (Some(sel), Some(monitor)) = (s.focus, s.sel_monitor) else {
            return;
        };
        let mask = self.config.tag_mask();
        let Some(c) = self.clients.get_mut(sel) else {
            return;
        };
        let new_tags = c.tags ^ (tags & mask);
        if new_tags == 0 {
            return;
        }
        c.tags = new_tags;
        self.focus(seat, None);
        self.arrange(Some(monitor));
    }

    /// View exactly `tags` on the seat's monitor. The previous view is kept
    /// in the second tagset slot, so viewing the same tags again (or zero)
    /// flips back.
    pub fn view(&mut self, seat: SeatId, tags: u32) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        let mask = self.config.tag_mask();
        {
            let Some(m) = self.monitors.get_mut(monitor) else {
                return;
            };
            if tags & mask == m.tagset[m.sel_tags] {
                return;
            }
            m.sel_tags ^= 1;
            if tags & mask != 0 {
                m.tagset[m.sel_tags] = tags & mask;
            }
        }
        self.focus(seat, None);
        self.arrange(Some(monitor));
    }

    fn toggle_view(&mut self, seat: SeatId, tags: u32) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        let mask = self.config.tag_mask();
        {
            let Some(m) = self.monitors.get_mut(monitor) else {
                return;
            };
            let new_set = m.tagset[m.sel_tags] ^ (tags & mask);
            if new_set == 0 {
                return;
            }
            m.tagset[m.sel_tags] = new_set;
        }
        self.focus(seat, None);
        self.arrange(Some(monitor));
    }

    fn toggle_bar(&mut self, seat: SeatId) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.show_bar = !m.show_bar;
        }
        self.update_bar_pos(monitor);
        self.move_bar(monitor);
        self.arrange(Some(monitor));
        self.bars_dirty();
    }

    fn toggle_floating(&mut self, seat: SeatId) {
        let Some(sel) = self.seats.get(seat).and_then(|s| s.focus) else {
            return;
        };
        let Some(c) = self.clients.get(sel) else {
            return;
        };
        if c.fullscreen {
            return;
        }
        let floating = c.floating;
        self.cancel_drags(seat);
        self.set_floating(sel, !floating, false, true);
    }

    fn toggle_fullscreen(&mut self, seat: SeatId) {
        let Some(sel) = self.seats.get(seat).and_then(|s| s.focus) else {
            return;
        };
        let Some(c) = self.clients.get(sel) else {
            return;
        };
        let fullscreen = c.fullscreen;
        self.cancel_drags(seat);
        self.set_fullscreen(sel, !fullscreen);
    }

    fn cancel_drags(&mut self, seat: SeatId) {
        let Some(s) = self.seats.get_mut(seat) else {
            return;
        };
        if s.move_drag.client.is_some() || s.resize_drag.client.is_some() {
            s.move_drag.client = None;
            s.resize_drag.client = None;
            if let Some(ptr) = s.pointer {
                self.display.ungrab_pointer(ptr);
            }
        }
    }

    /// Pin the seat's monitor: while pinned, selecting another monitor swaps
    /// contents instead of moving the seat.
    fn toggle_pin(&mut self, seat: SeatId) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        self.pinned = match self.pinned {
            Some(_) => None,
            None => Some(monitor),
        };
        let pinned = self.pinned.is_some();
        if let Some(sel) = self.seats.get(seat).and_then(|s| s.focus) {
            if self.update_window_type(sel) < WindowKind::Fullscreen {
                if let Some(c) = self.clients.get(sel) {
                    let scheme =
                        crate::backend::BorderScheme::from_seat_count(c.seats.len());
                    self.display.set_border_scheme(c.window, scheme, pinned);
                }
            }
        }
        // Bring the pointer home if it sits on another monitor.
        let pointer = self.seats.get(seat).and_then(|s| s.pointer);
        if let Some((x, y)) = pointer.and_then(|p| self.display.pointer_position(p)) {
            if let Some(other) = self.rect_to_mon(seat, x, y, 1, 1).filter(|&m| m != monitor) {
                let offset = |m: &crate::monitor::Monitor| {
                    if !m.show_bar {
                        0
                    } else if m.top_bar {
                        -self.bar_height
                    } else {
                        self.bar_height
                    }
                };
                if let (Some(cur), Some(tar), Some(ptr)) = (
                    self.monitors.get(monitor),
                    self.monitors.get(other),
                    pointer,
                ) {
                    let dx = cur.area.x() - tar.area.x();
                    let dy = (cur.area.y() + offset(cur)) - (tar.area.y() + offset(tar));
                    self.display.warp_pointer(ptr, dx, dy);
                }
            }
        }
        self.bars_dirty();
    }

    fn toggle_rmaster(&mut self, seat: SeatId) {
        let Some(monitor) = self.seats.get(seat).and_then(|s| s.sel_monitor) else {
            return;
        };
        let arranges = {
            let Some(m) = self.monitors.get_mut(monitor) else {
                return;
            };
            m.rmaster = !m.rmaster;
            m.mfact = 1.0 - m.mfact;
            m.layout().arranges()
        };
        if arranges {
            self.arrange(Some(monitor));
        }
    }

    fn toggle_mouse_grabs(&mut self, seat: SeatId) {
        let Some(sel) = self.seats.get(seat).and_then(|s| s.focus) else {
            return;
        };
        let Some(c) = self.clients.get_mut(sel) else {
            return;
        };
        if c.fullscreen {
            return;
        }
        c.grabbed = !c.grabbed;
        let (window, grabbed) = (c.window, c.grabbed);
        if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
            self.display.grab_client_buttons(ptr, window, true, grabbed);
        }
    }

    fn zoom(&mut self, seat: SeatId) {
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let (Some(sel), Some(monitor)) = (s.focus, s.sel_monitor) else {
            return;
        };
        let arranges = self
            .monitors
            .get(monitor)
            .map(|m| m.layout().arranges())
            .unwrap_or(false);
        if !arranges || self.clients.get(sel).is_some_and(|c| c.floating) {
            return;
        }
        let mut target = sel;
        if Some(sel) == self.next_tiled(monitor, 0) {
            let idx = self
                .monitors
                .get(monitor)
                .and_then(|m| m.clients.iter().position(|&c| c == sel));
            let next = idx.and_then(|i| self.next_tiled(monitor, i + 1));
            match next {
                Some(c) => target = c,
                None => return,
            }
        }
        self.detach(target);
        self.attach(target);
        self.focus(seat, Some(target));
        self.arrange(Some(monitor));
    }
}

#[cfg(test)]
mod tests {
    use crate::{command::Command, test_fixture::TestWm};

    #[test]
    fn zoom_promotes_to_master() {
        let mut t = TestWm::with_seats(1);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let seat = t.seat(0);
        let mon = t.wm.clients.get(a).unwrap().monitor;
        // Order is most-recent-first, so b is the master.
        assert_eq!(t.wm.monitors.get(mon).unwrap().clients[0], b);
        t.wm.focus(seat, Some(a));
        t.wm.run_command(seat, Command::Zoom);
        assert_eq!(t.wm.monitors.get(mon).unwrap().clients[0], a);
        // Zooming the master promotes the next tiled client instead.
        t.wm.run_command(seat, Command::Zoom);
        assert_eq!(t.wm.monitors.get(mon).unwrap().clients[0], b);
    }

    #[test]
    fn view_flips_back_on_zero() {
        let mut t = TestWm::with_seats(1);
        let seat = t.seat(0);
        let mon = t.wm.seats.get(seat).unwrap().sel_monitor.unwrap();
        t.wm.view(seat, 1 << 2);
        {
            let m = t.wm.monitors.get(mon).unwrap();
            assert_eq!(m.tagset[m.sel_tags], 1 << 2);
        }
        t.wm.view(seat, 0);
        let m = t.wm.monitors.get(mon).unwrap();
        assert_eq!(m.tagset[m.sel_tags], 1);
    }

    #[test]
    fn focus_stack_wraps_around() {
        let mut t = TestWm::with_seats(1);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let seat = t.seat(0);
        // Focus starts on b (front of the order).
        t.wm.run_command(seat, Command::FocusStack(1));
        assert_eq!(t.wm.seats.get(seat).unwrap().focus, Some(a));
        t.wm.run_command(seat, Command::FocusStack(1));
        assert_eq!(t.wm.seats.get(seat).unwrap().focus, Some(b));
        t.wm.run_command(seat, Command::FocusStack(-1));
        assert_eq!(t.wm.seats.get(seat).unwrap().focus, Some(a));
    }

    #[test]
    fn cycle_stack_rotates_client_order() {
        let mut t = TestWm::with_seats(1);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let c = t.add_window(3);
        let seat = t.seat(0);
        let mon = t.wm.clients.get(a).unwrap().monitor;
        assert_eq!(t.wm.monitors.get(mon).unwrap().clients, vec![c, b, a]);
        t.wm.run_command(seat, Command::CycleStack(1));
        assert_eq!(t.wm.monitors.get(mon).unwrap().clients, vec![b, a, c]);
        assert_eq!(t.wm.seats.get(seat).unwrap().focus, Some(b));
    }

    #[test]
    fn master_factor_rejects_extremes() {
        let mut t = TestWm::with_seats(1);
        let _ = t.add_window(1);
        let seat = t.seat(0);
        let mon = t.wm.seats.get(seat).unwrap().sel_monitor.unwrap();
        let before = t.wm.monitors.get(mon).unwrap().mfact;
        t.wm.run_command(seat, Command::SetMasterFactor(0.9));
        assert_eq!(t.wm.monitors.get(mon).unwrap().mfact, before);
        t.wm.run_command(seat, Command::SetMasterFactor(1.25));
        assert!((t.wm.monitors.get(mon).unwrap().mfact - 0.25).abs() < 1e-9);
    }

    #[test]
    fn kill_client_escalates_when_close_is_refused() {
        let mut t = TestWm::with_seats(1);
        let _ = t.add_window(1);
        let seat = t.seat(0);
        t.rec().refuse_close(1);
        t.wm.run_command(seat, Command::KillClient);
        assert!(t.rec().killed(1));
    }

    #[test]
    fn toggle_pin_round_trips() {
        let mut t = TestWm::with_monitors(2);
        let seat = t.seat(0);
        t.wm.run_command(seat, Command::TogglePin);
        assert_eq!(t.wm.pinned, Some(t.monitor(0)));
        t.wm.run_command(seat, Command::TogglePin);
        assert_eq!(t.wm.pinned, None);
    }

    #[test]
    fn swap_monitor_exchanges_screens() {
        let mut t = TestWm::with_monitors(2);
        let seat = t.seat(0);
        let m0 = t.monitor(0);
        let m1 = t.monitor(1);
        t.wm.run_command(seat, Command::SwapMonitor(-1));
        assert_eq!(t.wm.monitors.get(m0).unwrap().dim.x(), 1000);
        assert_eq!(t.wm.monitors.get(m1).unwrap().dim.x(), 0);
        assert_eq!(t.wm.seats.get(seat).unwrap().sel_monitor, Some(m1));
    }

    #[test]
    fn right_master_toggle_mirrors_factor() {
        let mut t = TestWm::with_seats(1);
        let seat = t.seat(0);
        let mon = t.wm.seats.get(seat).unwrap().sel_monitor.unwrap();
        let before = t.wm.monitors.get(mon).unwrap().mfact;
        t.wm.run_command(seat, Command::ToggleRightMaster);
        let m = t.wm.monitors.get(mon).unwrap();
        assert!(m.rmaster);
        assert!((m.mfact - (1.0 - before)).abs() < 1e-9);
    }
}
