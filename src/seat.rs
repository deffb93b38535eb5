//! Seats and the input-device registry. A seat is one master pointer plus
//! one master keyboard with any number of slave devices attached; the
//! display server announces device hierarchy changes in batches which get
//! folded into the registry here.

use {
    crate::{
        backend::{
            DeviceId, DeviceInfo, HierarchyChange, MASTER_ADDED, MASTER_REMOVED, SLAVE_ADDED,
            SLAVE_ATTACHED, SLAVE_DETACHED, SLAVE_REMOVED,
        },
        client::ClientId,
        monitor::MonitorId,
        state::Wm,
    },
    std::fmt::Write,
};

arena_ids!(SeatId);

/// In-flight pointer drag. `client` is armed while the triggering button is
/// held.
#[derive(Copy, Clone, Default)]
pub struct Motion {
    pub client: Option<ClientId>,
    /// Event time of the last applied motion, for coalescing.
    pub time: u64,
    /// Button that started the drag.
    pub button: u32,
    /// Pointer root position at drag start.
    pub x: i32,
    pub y: i32,
    /// Client origin at drag start.
    pub ox: i32,
    pub oy: i32,
}

#[derive(Default)]
pub struct Seat {
    pub pointer: Option<DeviceId>,
    pub keyboard: Option<DeviceId>,
    pub slaves: Vec<DeviceId>,

    pub sel_monitor: Option<MonitorId>,
    pub last_monitor: Option<MonitorId>,
    pub focus: Option<ClientId>,

    pub move_drag: Motion,
    pub resize_drag: Motion,
    pub last_event_time: u64,
    pub last_button: u32,
}

pub struct Device {
    pub info: DeviceInfo,
    pub seat: Option<SeatId>,
}

impl Wm {
    /// Build the seat list from the device hierarchy at startup.
    pub fn init_devices(&mut self) {
        let devices = self.display.devices();
        for info in &devices {
            self.devices.insert(
                info.id,
                Device {
                    info: *info,
                    seat: None,
                },
            );
        }
        for info in &devices {
            if !info.role.is_master() {
                continue;
            }
            self.adopt_master(*info);
        }
        for info in &devices {
            if info.role.is_master() {
                continue;
            }
            let Some(seat) = self.seat_of_device(info.attachment) else {
                fatal!("no seat for slave device {}", info.id);
            };
            self.attach_slave(info.id, seat);
        }
        self.place_fresh_seats();
    }

    /// Fold one hierarchy-change batch into the registry. Order matters:
    /// additions first so attachments can resolve, removals last so a master
    /// swap within one batch never tears the seat down.
    pub fn hierarchy_changed(&mut self, changes: &[HierarchyChange]) {
        if changes.is_empty() {
            return;
        }
        for ch in changes {
            if ch.flags.contains(MASTER_ADDED | SLAVE_ADDED) {
                self.devices.insert(
                    ch.info.id,
                    Device {
                        info: ch.info,
                        seat: None,
                    },
                );
            }
        }
        for ch in changes {
            if ch.flags.contains(MASTER_ADDED) && ch.info.role.is_master() {
                log::debug!("master added: {}", ch.info.id);
                self.adopt_master(ch.info);
            }
        }
        // Detach before attach so a slave moving between seats inside one
        // batch ends up on the new seat only.
        for ch in changes {
            if ch.flags.contains(SLAVE_DETACHED) && !ch.info.role.is_master() {
                log::debug!("slave detached: {}", ch.info.id);
                self.detach_slave(ch.info.id);
            }
        }
        for ch in changes {
            if ch.flags.contains(SLAVE_ADDED | SLAVE_ATTACHED) && !ch.info.role.is_master() {
                log::debug!("slave attached: {}", ch.info.id);
                if let Some(d) = self.devices.get_mut(&ch.info.id) {
                    d.info.attachment = ch.info.attachment;
                }
                let Some(seat) = self.seat_of_device(ch.info.attachment) else {
                    fatal!("no seat for slave device {}", ch.info.id);
                };
                self.attach_slave(ch.info.id, seat);
            }
        }
        for ch in changes {
            if ch.flags.contains(MASTER_REMOVED | SLAVE_REMOVED) {
                self.remove_device(ch.info.id);
            }
        }
        self.place_fresh_seats();
    }

    fn adopt_master(&mut self, info: DeviceInfo) {
        // Masters come in pairs; the attachment of one master is the other.
        let seat = match self.seat_of_device(info.attachment) {
            Some(seat) => seat,
            None => self.seats.insert(Seat::default()),
        };
        if let Some(s) = self.seats.get_mut(seat) {
            if info.role.is_pointer() {
                s.pointer = Some(info.id);
            } else {
                s.keyboard = Some(info.id);
            }
        }
        if let Some(d) = self.devices.get_mut(&info.id) {
            d.seat = Some(seat);
        }
    }

    fn attach_slave(&mut self, id: DeviceId, seat: SeatId) {
        if let Some(old) = self.devices.get(&id).and_then(|d| d.seat) {
            if let Some(s) = self.seats.get_mut(old) {
                s.slaves.retain(|&d| d != id);
            }
        }
        if let Some(s) = self.seats.get_mut(seat) {
            s.slaves.push(id);
        }
        if let Some(d) = self.devices.get_mut(&id) {
            d.seat = Some(seat);
        }
    }

    fn detach_slave(&mut self, id: DeviceId) {
        let Some(seat) = self.devices.get(&id).and_then(|d| d.seat) else {
            fatal!("no seat for slave device {}", id);
        };
        if let Some(s) = self.seats.get_mut(seat) {
            s.slaves.retain(|&d| d != id);
        }
        if let Some(d) = self.devices.get_mut(&id) {
            d.seat = None;
        }
    }

    fn remove_device(&mut self, id: DeviceId) {
        let Some(seat_id) = self.devices.get(&id).and_then(|d| d.seat) else {
            self.devices.remove(&id);
            return;
        };
        let mut seat_empty = false;
        if let Some(seat) = self.seats.get_mut(seat_id) {
            if seat.pointer == Some(id) {
                log::debug!("master pointer removed: {}", id);
                seat.pointer = None;
            } else if seat.keyboard == Some(id) {
                log::debug!("master keyboard removed: {}", id);
                seat.keyboard = None;
            } else {
                log::debug!("slave removed: {}", id);
                seat.slaves.retain(|&d| d != id);
            }
            if seat.pointer.is_none() && seat.keyboard.is_none() {
                if !seat.slaves.is_empty() {
                    fatal!("slaves still attached to a seat without masters");
                }
                seat_empty = true;
            }
        }
        if seat_empty {
            self.remove_seat(seat_id);
        }
        self.devices.remove(&id);
    }

    /// Point new seats at the monitor under their pointer and arm their
    /// grabs.
    fn place_fresh_seats(&mut self) {
        for seat in self.seats.ids() {
            let Some(s) = self.seats.get(seat) else {
                continue;
            };
            if s.last_monitor.is_some() {
                continue;
            }
            let Some(ptr) = s.pointer else {
                continue;
            };
            let Some((x, y)) = self.display.pointer_position(ptr) else {
                continue;
            };
            let Some(m) = self.rect_to_mon(seat, x, y, 1, 1) else {
                continue;
            };
            self.select_monitor(seat, m);
            self.update_seat_grabs(seat);
        }
    }

    pub fn seat_of_device(&self, id: DeviceId) -> Option<SeatId> {
        self.devices.get(&id).and_then(|d| d.seat)
    }

    pub fn remove_seat(&mut self, seat: SeatId) {
        self.set_selected(seat, None);
        if let Some(m) = self.seats.get(seat).and_then(|s| s.sel_monitor) {
            if let Some(m) = self.monitors.get_mut(m) {
                m.seats.retain(|s| *s != seat);
            }
        }
        self.seats.remove(seat);
    }

    /// Re-arm a seat's key grab and its button grabs on every client.
    pub fn update_seat_grabs(&mut self, seat: SeatId) {
        let Some(s) = self.seats.get(seat) else {
            return;
        };
        let (ptr, kbd) = (s.pointer, s.keyboard);
        if let Some(kbd) = kbd {
            self.display.grab_seat_keys(kbd);
        }
        if let Some(ptr) = ptr {
            for c in self.clients.ids() {
                let Some(c) = self.clients.get(c) else {
                    continue;
                };
                let (win, grabbed) = (c.window, c.grabbed);
                self.display.grab_client_buttons(ptr, win, false, grabbed);
            }
        }
    }

    /// Rebuild the client's multi-seat label from the keyboards focusing it,
    /// in focus order.
    pub fn refresh_client_label(&mut self, client: ClientId) {
        let Some(c) = self.clients.get(client) else {
            return;
        };
        let mut label = String::from("[");
        let mut first = true;
        for &seat in &c.seats {
            let Some(kbd) = self.seats.get(seat).and_then(|s| s.keyboard) else {
                continue;
            };
            if first {
                let _ = write!(label, "{}", kbd);
                first = false;
            } else {
                let _ = write!(label, ", {}", kbd);
            }
        }
        label.push(']');
        if let Some(c) = self.clients.get_mut(client) {
            c.label = label;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        backend::{
            DeviceId, DeviceInfo, DeviceRole, HierarchyChange, MASTER_ADDED, MASTER_REMOVED,
            SLAVE_ATTACHED, SLAVE_DETACHED, SLAVE_REMOVED,
        },
        test_fixture::TestWm,
    };

    #[test]
    fn startup_builds_one_seat_per_master_pair() {
        let t = TestWm::with_seats(2);
        assert_eq!(t.wm.seats.len(), 2);
        for (_, seat) in t.wm.seats.iter() {
            assert!(seat.pointer.is_some());
            assert!(seat.keyboard.is_some());
            assert!(seat.sel_monitor.is_some());
        }
    }

    #[test]
    fn master_pair_added_creates_seat() {
        let mut t = TestWm::with_seats(1);
        let changes = vec![
            HierarchyChange {
                info: DeviceInfo {
                    id: DeviceId(10),
                    role: DeviceRole::MasterPointer,
                    attachment: DeviceId(11),
                },
                flags: MASTER_ADDED,
            },
            HierarchyChange {
                info: DeviceInfo {
                    id: DeviceId(11),
                    role: DeviceRole::MasterKeyboard,
                    attachment: DeviceId(10),
                },
                flags: MASTER_ADDED,
            },
        ];
        t.wm.hierarchy_changed(&changes);
        assert_eq!(t.wm.seats.len(), 2);
        let seat = t.wm.seat_of_device(DeviceId(10)).unwrap();
        assert_eq!(t.wm.seat_of_device(DeviceId(11)), Some(seat));
    }

    #[test]
    fn slave_moves_between_seats_in_one_batch() {
        let mut t = TestWm::with_seats(2);
        let slave = t.add_slave_pointer(0);
        let seat0 = t.seat(0);
        let seat1 = t.seat(1);
        let new_master = t.wm.seats.get(seat1).unwrap().pointer.unwrap();
        let info = DeviceInfo {
            id: slave,
            role: DeviceRole::SlavePointer,
            attachment: new_master,
        };
        let changes = vec![
            HierarchyChange {
                info,
                flags: SLAVE_DETACHED,
            },
            HierarchyChange {
                info,
                flags: SLAVE_ATTACHED,
            },
        ];
        t.wm.hierarchy_changed(&changes);
        assert!(!t.wm.seats.get(seat0).unwrap().slaves.contains(&slave));
        assert!(t.wm.seats.get(seat1).unwrap().slaves.contains(&slave));
        assert_eq!(t.wm.seat_of_device(slave), Some(seat1));
    }

    #[test]
    fn removing_both_masters_tears_seat_down() {
        let mut t = TestWm::with_seats(2);
        let seat = t.seat(1);
        let s = t.wm.seats.get(seat).unwrap();
        let (ptr, kbd) = (s.pointer.unwrap(), s.keyboard.unwrap());
        let changes = vec![
            HierarchyChange {
                info: DeviceInfo {
                    id: ptr,
                    role: DeviceRole::MasterPointer,
                    attachment: kbd,
                },
                flags: MASTER_REMOVED,
            },
            HierarchyChange {
                info: DeviceInfo {
                    id: kbd,
                    role: DeviceRole::MasterKeyboard,
                    attachment: ptr,
                },
                flags: MASTER_REMOVED,
            },
        ];
        t.wm.hierarchy_changed(&changes);
        assert_eq!(t.wm.seats.len(), 1);
        assert!(!t.wm.seats.contains(seat));
    }

    #[test]
    fn slave_removal_keeps_seat() {
        let mut t = TestWm::with_seats(1);
        let slave = t.add_slave_pointer(0);
        let seat = t.seat(0);
        let changes = vec![HierarchyChange {
            info: DeviceInfo {
                id: slave,
                role: DeviceRole::SlavePointer,
                attachment: t.wm.seats.get(seat).unwrap().pointer.unwrap(),
            },
            flags: SLAVE_REMOVED,
        }];
        t.wm.hierarchy_changed(&changes);
        assert!(t.wm.seats.contains(seat));
        assert!(t.wm.seats.get(seat).unwrap().slaves.is_empty());
    }
}
