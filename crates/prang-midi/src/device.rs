//! Hardware MIDI ports via `midir`.
//!
//! The input callback runs on a backend thread; it decodes each packet and
//! pushes it into a [`midi_queue`](crate::queue::midi_queue) so the control
//! loop can `poll` without locking.

use crate::error::{Error, Result};
use crate::io::{MidiInput, MidiOutput};
use crate::message::MidiMessage;
use crate::queue::{midi_queue_with_capacity, MidiQueueConsumer, MidiQueueProducer};
use midir::{Ignore, MidiInputConnection, MidiOutputConnection};
use tracing::{debug, trace};

const CLIENT_NAME: &str = "prang";
const INPUT_QUEUE_CAPACITY: usize = 32;

/// Information about an available MIDI port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port index (for connection)
    pub index: usize,
    pub name: String,
}

/// How to pick a port when connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Index(usize),
    /// First port whose name contains this string (case-insensitive).
    Name(String),
}

impl PortSelector {
    fn pick(&self, ports: &[PortInfo]) -> Option<usize> {
        match self {
            PortSelector::Index(index) => ports.iter().position(|p| p.index == *index),
            PortSelector::Name(needle) => {
                let needle = needle.to_lowercase();
                ports
                    .iter()
                    .position(|p| p.name.to_lowercase().contains(&needle))
            }
        }
    }
}

fn describe_inputs(midi_input: &midir::MidiInput) -> Vec<PortInfo> {
    midi_input
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| PortInfo {
            index,
            name: midi_input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {index}")),
        })
        .collect()
}

fn describe_outputs(midi_output: &midir::MidiOutput) -> Vec<PortInfo> {
    midi_output
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| PortInfo {
            index,
            name: midi_output
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {index}")),
        })
        .collect()
}

pub fn list_input_ports() -> Result<Vec<PortInfo>> {
    Ok(describe_inputs(&midir::MidiInput::new(CLIENT_NAME)?))
}

pub fn list_output_ports() -> Result<Vec<PortInfo>> {
    Ok(describe_outputs(&midir::MidiOutput::new(CLIENT_NAME)?))
}

/// Connected hardware input. Dropping it closes the connection.
pub struct HardwareInput {
    name: String,
    consumer: MidiQueueConsumer,
    _connection: MidiInputConnection<MidiQueueProducer>,
}

impl HardwareInput {
    pub fn connect(selector: &PortSelector) -> Result<Self> {
        let mut midi_input = midir::MidiInput::new(CLIENT_NAME)?;
        midi_input.ignore(Ignore::None);

        let ports = midi_input.ports();
        let infos = describe_inputs(&midi_input);
        let slot = selector
            .pick(&infos)
            .ok_or_else(|| Error::MidiPort(format!("no input port matches {selector:?}")))?;
        let port = ports
            .get(infos[slot].index)
            .ok_or_else(|| Error::MidiPort(format!("input port {} vanished", infos[slot].index)))?;
        let name = infos[slot].name.clone();

        let (producer, consumer) = midi_queue_with_capacity(INPUT_QUEUE_CAPACITY);
        let connection = midi_input.connect(
            port,
            "prang-input",
            |_timestamp, bytes, producer: &mut MidiQueueProducer| {
                match MidiMessage::from_bytes(bytes) {
                    Ok(message) => {
                        if !producer.push(message) {
                            debug!("MIDI input queue full, dropping message");
                        }
                    }
                    Err(e) => trace!("Failed to decode MIDI packet: {}", e),
                }
            },
            producer,
        )?;

        debug!(port = %name, "connected MIDI input");
        Ok(Self {
            name,
            consumer,
            _connection: connection,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiInput for HardwareInput {
    fn poll(&mut self) -> Option<MidiMessage> {
        self.consumer.pop()
    }
}

/// Connected hardware output.
pub struct HardwareOutput {
    name: String,
    connection: MidiOutputConnection,
}

impl HardwareOutput {
    pub fn connect(selector: &PortSelector) -> Result<Self> {
        let midi_output = midir::MidiOutput::new(CLIENT_NAME)?;
        let ports = midi_output.ports();
        let infos = describe_outputs(&midi_output);
        let slot = selector
            .pick(&infos)
            .ok_or_else(|| Error::MidiPort(format!("no output port matches {selector:?}")))?;
        let port = ports
            .get(infos[slot].index)
            .ok_or_else(|| Error::MidiPort(format!("output port {} vanished", infos[slot].index)))?;
        let name = infos[slot].name.clone();

        let connection = midi_output.connect(port, "prang-output")?;
        debug!(port = %name, "connected MIDI output");
        Ok(Self { name, connection })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MidiOutput for HardwareOutput {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        self.connection.send(message.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<PortInfo> {
        vec![
            PortInfo {
                index: 0,
                name: "Midi Through".into(),
            },
            PortInfo {
                index: 1,
                name: "Teensy MIDI".into(),
            },
        ]
    }

    #[test]
    fn test_selector_by_index() {
        assert_eq!(PortSelector::Index(1).pick(&ports()), Some(1));
        assert_eq!(PortSelector::Index(7).pick(&ports()), None);
    }

    #[test]
    fn test_selector_by_name_is_case_insensitive() {
        assert_eq!(PortSelector::Name("teensy".into()).pick(&ports()), Some(1));
        assert_eq!(PortSelector::Name("nope".into()).pick(&ports()), None);
    }
}
