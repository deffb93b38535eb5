//! Per-seat focus. Every seat has its own selected client and monitor; a
//! client's border tier and title prefix reflect how many seats sit on it.

use {
    crate::{
        backend::BorderScheme,
        client::{ClientId, WindowKind},
        monitor::MonitorId,
        seat::SeatId,
        state::Wm,
    },
};

impl Wm {
    /// Point a seat's selection at `client`. Maintains the client's seat
    /// stack, border tier and label on both the old and new selection.
    /// Callers that skip a following [`focus`](Wm::focus) call use this
    /// directly.
    pub fn set_selected(&mut self, seat: SeatId, client: Option<ClientId>) {
        let old = self.seats.get(seat).and_then(|s| s.focus);
        if old == client {
            return;
        }
        let pinned = self.pinned.is_some();
        if let Some(old) = old {
            if let Some(c) = self.clients.get_mut(old) {
                c.seats.retain(|s| *s != seat);
            }
            if self.update_window_type(old) < WindowKind::Fullscreen {
                if let Some(c) = self.clients.get(old) {
                    let scheme = BorderScheme::from_seat_count(c.seats.len());
                    self.display.set_border_scheme(c.window, scheme, pinned);
                }
            }
            self.refresh_client_label(old);
        }
        if let Some(s) = self.seats.get_mut(seat) {
            s.focus = client;
        }
        if let Some(new) = client {
            if let Some(c) = self.clients.get_mut(new) {
                c.seats.push(seat);
            }
            if self.update_window_type(new) < WindowKind::Fullscreen {
                if let Some(c) = self.clients.get(new) {
                    let scheme = BorderScheme::from_seat_count(c.seats.len());
                    self.display.set_border_scheme(c.window, scheme, pinned);
                }
            }
            self.refresh_client_label(new);
        }
    }

    /// Focus a client, or the seat's monitor's stack top when `client` is
    /// `None` or not visible.
    pub fn focus(&mut self, seat: SeatId, client: Option<ClientId>) {
        let sel = self.seats.get(seat).and_then(|s| s.focus);
        if client.is_some() && sel == client {
            return;
        }
        let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);

        let visible = |wm: &Wm, c: ClientId| {
            wm.clients
                .get(c)
                .and_then(|c| wm.monitors.get(c.monitor).map(|m| m.shows(c.tags)))
                .unwrap_or(false)
        };
        let mut client = client.filter(|&c| visible(self, c));
        if client.is_none() {
            if let Some(m) = selmon.and_then(|m| self.monitors.get(m)) {
                client = m.stack.iter().copied().find(|&c| visible(self, c));
            }
        }

        if sel.is_some() && sel != client {
            self.unfocus(seat, false);
        }

        if let Some(c) = client {
            let (monitor, urgent, unshared, window, grabbed) = {
                let Some(cl) = self.clients.get(c) else {
                    return;
                };
                (
                    cl.monitor,
                    cl.urgent,
                    cl.seats.is_empty(),
                    cl.window,
                    cl.grabbed,
                )
            };
            if Some(monitor) != selmon {
                self.select_monitor(seat, monitor);
            }
            if urgent {
                self.set_urgent(c, false);
            }
            // A client nobody focuses yet rises to the top of the stack.
            if unshared {
                self.detach_stack(c);
                self.attach_stack(c);
            }
            if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
                self.display.grab_client_buttons(ptr, window, true, grabbed);
            }
            self.keyboard_focus(seat, c);
        } else {
            if let Some(s) = self.seats.get(seat) {
                if let Some(kbd) = s.keyboard {
                    self.display.set_keyboard_focus(kbd, None);
                }
                if let Some(ptr) = s.pointer {
                    self.display.set_client_pointer(None, ptr);
                }
            }
            self.display.advertise_active_window(None);
        }

        self.set_selected(seat, client);

        // The display server tracks one focus per keyboard; re-assert the
        // other seats on this monitor so ours does not steal theirs.
        let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
        if let Some(m) = selmon.and_then(|m| self.monitors.get(m)) {
            let others: Vec<SeatId> = m.seats.iter().copied().filter(|&s| s != seat).collect();
            for other in others {
                let Some(c) = self.seats.get(other).and_then(|s| s.focus) else {
                    continue;
                };
                self.unfocus(other, true);
                let Some(cl) = self.clients.get(c) else {
                    continue;
                };
                let (window, grabbed) = (cl.window, cl.grabbed);
                if let Some(ptr) = self.seats.get(other).and_then(|s| s.pointer) {
                    self.display.grab_client_buttons(ptr, window, true, grabbed);
                }
                self.keyboard_focus(other, c);
            }
        }
        self.bars_dirty();
    }

    /// Drop protocol focus state for a seat's selection without changing the
    /// selection itself. `release` hands keyboard focus back to the root.
    pub fn unfocus(&mut self, seat: SeatId, release: bool) {
        let Some(c) = self.seats.get(seat).and_then(|s| s.focus) else {
            return;
        };
        let Some(cl) = self.clients.get(c) else {
            return;
        };
        let (window, floating, grabbed) = (cl.window, cl.floating, cl.grabbed);
        if let Some(ptr) = self.seats.get(seat).and_then(|s| s.pointer) {
            self.display.grab_client_buttons(ptr, window, false, grabbed);
        }
        if floating {
            self.display
                .restack(window, crate::backend::StackLayer::Floating);
        }
        if release {
            if let Some(s) = self.seats.get(seat) {
                if let Some(kbd) = s.keyboard {
                    self.display.set_keyboard_focus(kbd, None);
                }
                if let Some(ptr) = s.pointer {
                    self.display.set_client_pointer(None, ptr);
                }
            }
            self.display.advertise_active_window(None);
        }
    }

    /// Hand a seat's keyboard focus to a client, honoring the no-input hint.
    pub fn keyboard_focus(&mut self, seat: SeatId, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let (window, never_focus, floating) = (c.window, c.never_focus, c.floating);
        if !never_focus {
            if let Some(s) = self.seats.get(seat) {
                if let Some(kbd) = s.keyboard {
                    self.display.set_keyboard_focus(kbd, Some(window));
                }
                if let Some(ptr) = s.pointer {
                    self.display.set_client_pointer(Some(window), ptr);
                }
            }
            self.display.advertise_active_window(Some(window));
            if floating {
                self.display
                    .restack(window, crate::backend::StackLayer::FloatingFocused);
            }
        }
        self.display.send_take_focus(window);
    }

    /// Move a seat to another monitor. With a pinned monitor this instead
    /// swaps monitor contents so the seat never leaves the pinned screen.
    pub fn select_monitor(&mut self, seat: SeatId, monitor: MonitorId) {
        let selmon = self.seats.get(seat).and_then(|s| s.sel_monitor);
        if selmon == Some(monitor) || self.forcing_focus {
            return;
        }

        if let (Some(pinned), Some(cur)) = (self.pinned, selmon) {
            if monitor != pinned && self.mon_order.len() > 1 {
                self.pinned_swap(seat, cur, monitor);
            }
        }

        if let Some(cur) = selmon {
            if let Some(m) = self.monitors.get_mut(cur) {
                m.seats.retain(|s| *s != seat);
            }
        }
        if let Some(s) = self.seats.get_mut(seat) {
            s.last_monitor = s.sel_monitor;
            s.sel_monitor = Some(monitor);
        }
        if let Some(m) = self.monitors.get_mut(monitor) {
            m.seats.push(seat);
        }

        if self.forcing_focus {
            // Events that raced the swap still refer to the old geometry;
            // replay them with selection changes suppressed.
            for event in self.display.drain_events() {
                self.dispatch(event);
            }
            self.forcing_focus = false;
        }
        self.bars_dirty();
    }

    /// Swap the contents of the pinned monitor with the target (rotating a
    /// third monitor in when the target came from the opposite direction),
    /// keeping the pointer on the physical screen it was on.
    fn pinned_swap(&mut self, seat: SeatId, cur: MonitorId, tar: MonitorId) {
        let dir = match (self.monitors.get(cur), self.monitors.get(tar)) {
            (Some(c), Some(t)) => c.dim.center_x() - t.dim.center_x(),
            _ => return,
        };
        self.forcing_focus = true;
        let tar2 = self
            .dir_to_mon(seat, -dir)
            .filter(|&m| m != tar && m != cur);

        let pointer = self.seats.get(seat).and_then(|s| s.pointer);
        let on_cur = pointer
            .and_then(|p| self.display.pointer_position(p))
            .map(|(x, y)| self.rect_to_mon(seat, x, y, 1, 1) == Some(cur))
            .unwrap_or(false);
        let dragging = self
            .seats
            .get(seat)
            .is_some_and(|s| s.move_drag.client.is_some());
        if !on_cur || dragging {
            let offset = |m: &crate::monitor::Monitor| {
                if !m.show_bar {
                    0
                } else if m.top_bar {
                    -self.bar_height
                } else {
                    self.bar_height
                }
            };
            if let (Some(c), Some(t), Some(ptr)) =
                (self.monitors.get(cur), self.monitors.get(tar), pointer)
            {
                let dx = c.area.x() - t.area.x();
                let dy = (c.area.y() + offset(c)) - (t.area.y() + offset(t));
                self.display.warp_pointer(ptr, dx, dy);
            }
        }

        self.pinned = Some(tar);
        self.display.sync();

        self.swap_monitor_places(cur, tar);
        if let Some(tar2) = tar2 {
            self.swap_monitor_places(cur, tar2);
            self.update_bar_pos(tar2);
            self.move_bar(tar2);
            self.arrange(Some(tar2));
        }
        self.update_bar_pos(tar);
        self.update_bar_pos(cur);
        self.move_bar(cur);
        self.move_bar(tar);
        self.arrange(Some(tar));
        self.arrange(Some(cur));
        self.display.sync();
    }

    /// Exchange everything tied to the physical screen while each monitor
    /// keeps its client lists and tags.
    pub(crate) fn swap_monitor_places(&mut self, a: MonitorId, b: MonitorId) {
        let Some(ma) = self.monitors.get(a) else {
            return;
        };
        let fields_a = (ma.nmaster, ma.bar_win, ma.mfact, ma.rmaster, ma.num, ma.dim, ma.area);
        let Some(mb) = self.monitors.get_mut(b) else {
            return;
        };
        let fields_b = (mb.nmaster, mb.bar_win, mb.mfact, mb.rmaster, mb.num, mb.dim, mb.area);
        (mb.nmaster, mb.bar_win, mb.mfact, mb.rmaster, mb.num, mb.dim, mb.area) = fields_a;
        let Some(ma) = self.monitors.get_mut(a) else {
            return;
        };
        (ma.nmaster, ma.bar_win, ma.mfact, ma.rmaster, ma.num, ma.dim, ma.area) = fields_b;
    }
}

#[cfg(test)]
mod tests {
    use crate::{backend::BorderScheme, test_fixture::TestWm};

    #[test]
    fn refocusing_the_selection_is_a_noop() {
        let mut t = TestWm::with_seats(1);
        let a = t.add_window(1);
        let seat = t.seat(0);
        t.wm.focus(seat, Some(a));
        t.rec().reset_calls();
        t.wm.focus(seat, Some(a));
        assert_eq!(t.rec().call_count(), 0);
    }

    #[test]
    fn two_seats_share_a_client() {
        let mut t = TestWm::with_seats(2);
        let a = t.add_window(1);
        let s0 = t.seat(0);
        let s1 = t.seat(1);
        t.wm.focus(s0, Some(a));
        t.wm.focus(s1, Some(a));
        let c = t.wm.clients.get(a).unwrap();
        assert_eq!(c.seats.as_slice(), &[s0, s1]);
        assert_eq!(t.rec().border_scheme(1), Some(BorderScheme::Sel2));
        assert_eq!(c.label, "[2, 12]");
    }

    #[test]
    fn seat_leaving_shared_client_downgrades_border() {
        let mut t = TestWm::with_seats(2);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let s0 = t.seat(0);
        let s1 = t.seat(1);
        t.wm.focus(s0, Some(a));
        t.wm.focus(s1, Some(a));
        t.wm.focus(s1, Some(b));
        assert_eq!(t.rec().border_scheme(1), Some(BorderScheme::Sel));
        assert_eq!(t.wm.clients.get(a).unwrap().label, "[2]");
    }

    #[test]
    fn only_unfocused_clients_get_promoted() {
        let mut t = TestWm::with_seats(2);
        let a = t.add_window(1);
        let b = t.add_window(2);
        let s0 = t.seat(0);
        let s1 = t.seat(1);
        t.wm.focus(s0, Some(a));
        t.wm.focus(s1, Some(a));
        // b is unfocused, so focusing it promotes it to the stack top.
        t.wm.focus(s0, Some(b));
        let mon = t.wm.clients.get(b).unwrap().monitor;
        assert_eq!(t.wm.monitors.get(mon).unwrap().stack[0], b);
        // a still has a seat on it, so refocusing it does not reshuffle.
        t.wm.focus(s0, Some(a));
        assert_eq!(t.wm.monitors.get(mon).unwrap().stack[0], b);
    }

    #[test]
    fn focus_none_picks_stack_top() {
        let mut t = TestWm::with_seats(1);
        let _a = t.add_window(1);
        let b = t.add_window(2);
        let seat = t.seat(0);
        t.wm.focus(seat, None);
        assert_eq!(t.wm.seats.get(seat).unwrap().focus, Some(b));
    }

    #[test]
    fn pinned_seat_swaps_monitors_instead_of_moving() {
        let mut t = TestWm::with_monitors(2);
        let seat = t.seat(0);
        let m0 = t.monitor(0);
        let m1 = t.monitor(1);
        t.wm.pinned = Some(m0);
        t.wm.select_monitor(seat, m1);
        // The seat follows the target id, which now occupies the screen the
        // seat was physically on.
        assert_eq!(t.wm.seats.get(seat).unwrap().sel_monitor, Some(m1));
        assert_eq!(t.wm.pinned, Some(m1));
        assert_eq!(t.wm.monitors.get(m1).unwrap().dim.x(), 0);
        assert_eq!(t.wm.monitors.get(m0).unwrap().dim.x(), 1000);
        assert!(!t.wm.forcing_focus);
    }
}
