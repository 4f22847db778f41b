//! Current-value store of the simulated device.
//!
//! A two-level map `object id -> address -> value` that answers polls with
//! the values it currently holds, absorbs writes from peers and advances
//! oscillating simulation values on every tick. Callers guard the store with
//! the engine's mutex; the store itself is plain data.

use ahash::AHashMap;

use crate::{
    object::{Address, RemoteObjectId, RemoteObjectMessage, UNADDRESSED_VALUE, Value},
    snapshot::SimulationSnapshot,
};

/// The device name the simulation reports when polled.
pub const SIMULATED_DEVICE_NAME: &str = "DS100_DeviceSimulation";

/// The remote objects the simulation initialises and ticks.
pub const SIMULATED_OBJECTS: &[RemoteObjectId] = &[
    // sound object related remote objects
    RemoteObjectId::CoordMappingPositionXy,
    RemoteObjectId::CoordMappingPositionX,
    RemoteObjectId::CoordMappingPositionY,
    RemoteObjectId::SourceSpread,
    RemoteObjectId::SourceDelayMode,
    RemoteObjectId::MatrixInputReverbSendGain,
    // matrix input related remote objects
    RemoteObjectId::MatrixInputLevelPreMute,
    RemoteObjectId::MatrixInputGain,
    RemoteObjectId::MatrixInputMute,
    // matrix output related remote objects
    RemoteObjectId::MatrixOutputLevelPostMute,
    RemoteObjectId::MatrixOutputGain,
    RemoteObjectId::MatrixOutputMute,
    // naming related remote objects
    RemoteObjectId::MatrixInputChannelName,
    RemoteObjectId::MatrixOutputChannelName,
    RemoteObjectId::DeviceName,
];

pub struct ValueStore {
    values: AHashMap<RemoteObjectId, AHashMap<Address, Value>>,
    channel_count: u16,
    mapping_count: u16,
    /// Rolling phase the oscillating simulation values are derived from.
    phase: f32,
}

impl ValueStore {
    pub fn new(channel_count: u16, mapping_count: u16) -> Self {
        let mut store = Self {
            values: AHashMap::new(),
            channel_count,
            mapping_count,
            phase: 0.0,
        };

        store.init_values();
        store
    }

    /// Drops all held values and rebuilds the initial grid, e.g. after a
    /// reconfiguration changed the simulated channel or mapping counts.
    pub fn reinit(&mut self, channel_count: u16, mapping_count: u16) {
        self.channel_count = channel_count;
        self.mapping_count = mapping_count;
        self.phase = 0.0;
        self.values.clear();
        self.init_values();
    }

    pub fn get(&self, id: RemoteObjectId, address: Address) -> Option<&Value> {
        self.values.get(&id)?.get(&address)
    }

    fn get_mut(&mut self, id: RemoteObjectId, address: Address) -> Option<&mut Value> {
        self.values.get_mut(&id)?.get_mut(&address)
    }

    /// Commits an incoming write to the store.
    ///
    /// The combined x/y position object and the single x and y objects are
    /// observed by peers as independent, so a write to one side is copied
    /// into the other before the primary value is committed. The copies are
    /// best-effort: a missing entry or an arity mismatch silently skips that
    /// side, the primary write commits regardless.
    pub fn set_value(&mut self, id: RemoteObjectId, message: &RemoteObjectMessage) {
        use RemoteObjectId::*;

        let address = message.address;
        match (id, &message.value) {
            (CoordMappingPositionX, Value::Float(x)) if x.len() == 1 => {
                if let Some(Value::Float(xy)) = self.get_mut(CoordMappingPositionXy, address) {
                    if xy.len() == 2 {
                        xy[0] = x[0];
                    }
                }
            }
            (CoordMappingPositionY, Value::Float(y)) if y.len() == 1 => {
                if let Some(Value::Float(xy)) = self.get_mut(CoordMappingPositionXy, address) {
                    if xy.len() == 2 {
                        xy[1] = y[0];
                    }
                }
            }
            (CoordMappingPositionXy, Value::Float(xy)) if xy.len() == 2 => {
                let (new_x, new_y) = (xy[0], xy[1]);
                if let Some(Value::Float(x)) = self.get_mut(CoordMappingPositionX, address) {
                    if x.len() == 1 {
                        x[0] = new_x;
                    }
                }
                if let Some(Value::Float(y)) = self.get_mut(CoordMappingPositionY, address) {
                    if y.len() == 1 {
                        y[0] = new_y;
                    }
                }
            }
            _ => {}
        }

        self.values
            .entry(id)
            .or_default()
            .insert(address, message.value.clone());
    }

    /// Advances the rolling phase and regenerates all oscillating values.
    ///
    /// Static objects (names, device name) keep their initial values. Gains
    /// and level meters are mapped into their declared dB range, the y side
    /// of positions follows the cosine so that x/y traces a circle on a 2d
    /// surface, mutes toggle between 0 and 1 and the delay mode cycles
    /// through its three states.
    pub fn tick_update(&mut self) {
        self.phase += 0.1;

        for &id in SIMULATED_OBJECTS {
            if id.is_static_value_object() {
                continue;
            }

            let Some(entries) = self.values.get_mut(&id) else {
                continue;
            };

            for (address, value) in entries.iter_mut() {
                let base = self.phase + 0.1 * address.channel as f32;
                let val1 = (base.sin() + 1.0) * 0.5;
                let val2 = (base.cos() + 1.0) * 0.5;

                match value {
                    Value::Float(payload) if payload.len() == 1 => {
                        payload[0] = if let Some((start, end)) = id.generator_range() {
                            val1 * (end - start) + start
                        } else if id == RemoteObjectId::CoordMappingPositionY {
                            val2
                        } else {
                            val1
                        };
                    }
                    Value::Float(payload) if payload.len() == 2 => {
                        payload[0] = val1;
                        payload[1] = val2;
                    }
                    Value::Int(payload) if payload.len() == 1 => {
                        payload[0] = match id {
                            // three-state delay mode
                            RemoteObjectId::SourceDelayMode => (val1 * 3.0) as i32,
                            // mute states switch between 0 and 1, the
                            // float-to-int cast truncates and needs the offset
                            RemoteObjectId::MatrixInputMute
                            | RemoteObjectId::MatrixOutputMute => (val1 + 0.5) as i32,
                            _ => val1 as i32,
                        };
                    }
                    Value::Int(payload) if payload.len() == 2 => {
                        payload[0] = val1 as i32;
                        payload[1] = val2 as i32;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Builds the numeric snapshot handed to simulation listeners: floats
    /// verbatim, ints widened to floats, strings and empty values omitted.
    pub fn build_snapshot(&self) -> SimulationSnapshot {
        let mut snapshot = SimulationSnapshot::default();

        for (&id, entries) in &self.values {
            for (&address, value) in entries {
                match value {
                    Value::Float(payload) => snapshot.insert(address, id, payload.clone()),
                    Value::Int(payload) => {
                        snapshot.insert(address, id, payload.iter().map(|&v| v as f32).collect())
                    }
                    Value::String(_) | Value::None => {}
                }
            }
        }

        snapshot
    }

    fn init_values(&mut self) {
        self.values
            .entry(RemoteObjectId::HeartbeatPing)
            .or_default()
            .insert(Address::UNADDRESSED, Value::None);
        self.values
            .entry(RemoteObjectId::HeartbeatPong)
            .or_default()
            .insert(Address::UNADDRESSED, Value::None);
        self.values
            .entry(RemoteObjectId::DeviceName)
            .or_default()
            .insert(
                Address::UNADDRESSED,
                Value::String(SIMULATED_DEVICE_NAME.to_string()),
            );

        for &id in SIMULATED_OBJECTS {
            let mappings: Vec<i32> = if id.is_mapping_addressed() {
                (1..=self.mapping_count as i32).collect()
            } else {
                vec![UNADDRESSED_VALUE]
            };

            let channels: Vec<i32> = if id.is_channel_addressed() {
                (1..=self.channel_count as i32).collect()
            } else {
                vec![UNADDRESSED_VALUE]
            };

            let entries = self.values.entry(id).or_default();
            for &mapping in &mappings {
                for &channel in &channels {
                    entries
                        .entry(Address::new(channel, mapping))
                        .or_insert_with(|| Self::initial_value(id, channel));
                }
            }
        }
    }

    fn initial_value(id: RemoteObjectId, channel: i32) -> Value {
        use RemoteObjectId::*;

        match id {
            CoordMappingPositionXy => Value::Float(vec![0.0, 0.0]),
            CoordMappingPositionX | CoordMappingPositionY | SourceSpread
            | MatrixInputReverbSendGain | MatrixInputLevelPreMute | MatrixInputGain
            | MatrixOutputLevelPostMute | MatrixOutputGain => Value::Float(vec![0.0]),
            SourceDelayMode | MatrixInputMute | MatrixOutputMute => Value::Int(vec![0]),
            MatrixInputChannelName => Value::String(format!("MatrixInput{channel}")),
            MatrixOutputChannelName => Value::String(format!("MatrixOutput{channel}")),
            _ => Value::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_grid_respects_addressing_classes() {
        let store = ValueStore::new(4, 2);

        // mapping addressed positions span channels x mappings
        for mapping in 1..=2 {
            for channel in 1..=4 {
                assert_eq!(
                    store.get(
                        RemoteObjectId::CoordMappingPositionXy,
                        Address::new(channel, mapping)
                    ),
                    Some(&Value::Float(vec![0.0, 0.0]))
                );
            }
        }

        // channel-only objects live at the mapping sentinel
        assert_eq!(
            store.get(
                RemoteObjectId::MatrixInputGain,
                Address::new(3, UNADDRESSED_VALUE)
            ),
            Some(&Value::Float(vec![0.0]))
        );
        assert!(
            store
                .get(RemoteObjectId::MatrixInputGain, Address::new(3, 1))
                .is_none()
        );

        // the device name keeps its fixed string
        assert_eq!(
            store.get(RemoteObjectId::DeviceName, Address::UNADDRESSED),
            Some(&Value::String(SIMULATED_DEVICE_NAME.to_string()))
        );

        assert_eq!(
            store.get(
                RemoteObjectId::MatrixInputChannelName,
                Address::new(2, UNADDRESSED_VALUE)
            ),
            Some(&Value::String("MatrixInput2".to_string()))
        );
    }

    #[test]
    fn zero_counts_produce_no_addressed_entries() {
        let store = ValueStore::new(0, 0);

        assert!(
            store
                .get(RemoteObjectId::MatrixInputGain, Address::new(1, -1))
                .is_none()
        );
        assert!(
            store
                .get(RemoteObjectId::CoordMappingPositionXy, Address::new(1, 1))
                .is_none()
        );

        // unaddressed placeholders survive
        assert_eq!(
            store.get(RemoteObjectId::HeartbeatPing, Address::UNADDRESSED),
            Some(&Value::None)
        );
        assert_eq!(
            store.get(RemoteObjectId::DeviceName, Address::UNADDRESSED),
            Some(&Value::String(SIMULATED_DEVICE_NAME.to_string()))
        );
    }

    #[test]
    fn write_x_updates_combined_pair() {
        let mut store = ValueStore::new(8, 1);
        let address = Address::new(3, 1);

        store.set_value(
            RemoteObjectId::CoordMappingPositionX,
            &RemoteObjectMessage::new(address, Value::Float(vec![0.7])),
        );

        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionX, address),
            Some(&Value::Float(vec![0.7]))
        );
        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionXy, address),
            Some(&Value::Float(vec![0.7, 0.0]))
        );
    }

    #[test]
    fn write_pair_updates_x_and_y() {
        let mut store = ValueStore::new(8, 1);
        let address = Address::new(3, 1);

        store.set_value(
            RemoteObjectId::CoordMappingPositionXy,
            &RemoteObjectMessage::new(address, Value::Float(vec![0.4, 0.6])),
        );

        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionX, address),
            Some(&Value::Float(vec![0.4]))
        );
        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionY, address),
            Some(&Value::Float(vec![0.6]))
        );
        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionXy, address),
            Some(&Value::Float(vec![0.4, 0.6]))
        );
    }

    #[test]
    fn mismatched_arity_skips_propagation_but_commits() {
        let mut store = ValueStore::new(8, 1);
        let address = Address::new(3, 1);

        // an x write with a bogus two-float payload must not touch the pair,
        // but still shadows the x entry
        store.set_value(
            RemoteObjectId::CoordMappingPositionX,
            &RemoteObjectMessage::new(address, Value::Float(vec![0.1, 0.2])),
        );

        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionXy, address),
            Some(&Value::Float(vec![0.0, 0.0]))
        );
        assert_eq!(
            store.get(RemoteObjectId::CoordMappingPositionX, address),
            Some(&Value::Float(vec![0.1, 0.2]))
        );
    }

    #[test]
    fn write_to_unknown_address_inserts_entry() {
        let mut store = ValueStore::new(2, 1);
        let address = Address::new(17, 1);

        store.set_value(
            RemoteObjectId::MatrixInputGain,
            &RemoteObjectMessage::new(address, Value::Float(vec![-6.0])),
        );

        assert_eq!(
            store.get(RemoteObjectId::MatrixInputGain, address),
            Some(&Value::Float(vec![-6.0]))
        );
    }

    #[test]
    fn tick_traces_circle_and_respects_ranges() {
        let mut store = ValueStore::new(1, 1);

        store.tick_update();
        store.tick_update();

        // mirror the generator arithmetic in f32
        let base = (0.1f32 + 0.1) + 0.1 * 1.0;
        let val1 = (base.sin() + 1.0) * 0.5;
        let val2 = (base.cos() + 1.0) * 0.5;

        let Some(Value::Float(x)) =
            store.get(RemoteObjectId::CoordMappingPositionX, Address::new(1, 1))
        else {
            panic!("missing x entry");
        };
        let Some(Value::Float(y)) =
            store.get(RemoteObjectId::CoordMappingPositionY, Address::new(1, 1))
        else {
            panic!("missing y entry");
        };
        let Some(Value::Float(xy)) =
            store.get(RemoteObjectId::CoordMappingPositionXy, Address::new(1, 1))
        else {
            panic!("missing xy entry");
        };

        assert!((x[0] - val1).abs() < 1e-6);
        assert!((y[0] - val2).abs() < 1e-6);
        assert!((xy[0] - val1).abs() < 1e-6);
        assert!((xy[1] - val2).abs() < 1e-6);

        // generator outputs stay inside [0, 1]
        assert!((0.0..=1.0).contains(&val1));
        assert!((0.0..=1.0).contains(&val2));

        // gains land inside their declared dB range
        let Some(Value::Float(gain)) =
            store.get(RemoteObjectId::MatrixInputGain, Address::new(1, -1))
        else {
            panic!("missing gain entry");
        };
        assert!((-120.0..=24.0).contains(&gain[0]));

        let Some(Value::Float(level)) =
            store.get(RemoteObjectId::MatrixOutputLevelPostMute, Address::new(1, -1))
        else {
            panic!("missing level entry");
        };
        assert!((-120.0..=0.0).contains(&level[0]));

        // mutes are bi-state, the delay mode tri-state
        let Some(Value::Int(mute)) =
            store.get(RemoteObjectId::MatrixInputMute, Address::new(1, -1))
        else {
            panic!("missing mute entry");
        };
        assert!(mute[0] == 0 || mute[0] == 1);

        let Some(Value::Int(mode)) =
            store.get(RemoteObjectId::SourceDelayMode, Address::new(1, -1))
        else {
            panic!("missing delay mode entry");
        };
        assert!((0..=2).contains(&mode[0]));
    }

    #[test]
    fn tick_never_touches_static_objects() {
        let mut store = ValueStore::new(2, 1);

        for _ in 0..5 {
            store.tick_update();
        }

        assert_eq!(
            store.get(
                RemoteObjectId::MatrixInputChannelName,
                Address::new(1, UNADDRESSED_VALUE)
            ),
            Some(&Value::String("MatrixInput1".to_string()))
        );
        assert_eq!(
            store.get(
                RemoteObjectId::MatrixOutputChannelName,
                Address::new(2, UNADDRESSED_VALUE)
            ),
            Some(&Value::String("MatrixOutput2".to_string()))
        );
        assert_eq!(
            store.get(RemoteObjectId::DeviceName, Address::UNADDRESSED),
            Some(&Value::String(SIMULATED_DEVICE_NAME.to_string()))
        );
    }

    #[test]
    fn snapshot_widens_ints_and_omits_strings() {
        let mut store = ValueStore::new(1, 1);
        store.set_value(
            RemoteObjectId::MatrixInputMute,
            &RemoteObjectMessage::new(Address::new(1, -1), Value::Int(vec![1])),
        );

        let snapshot = store.build_snapshot();

        assert_eq!(
            snapshot.get(Address::new(1, -1), RemoteObjectId::MatrixInputMute),
            Some(&[1.0][..])
        );
        assert_eq!(
            snapshot.get(Address::new(1, 1), RemoteObjectId::CoordMappingPositionXy),
            Some(&[0.0, 0.0][..])
        );
        assert!(
            snapshot
                .get(Address::UNADDRESSED, RemoteObjectId::DeviceName)
                .is_none()
        );
        assert!(
            snapshot
                .get(Address::UNADDRESSED, RemoteObjectId::HeartbeatPing)
                .is_none()
        );
    }
}
