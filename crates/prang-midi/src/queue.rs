//! Lock-free single-producer/single-consumer message queue.
//!
//! Bridges a device callback thread (producer) and the control loop
//! (consumer) without locking inside the tick.

use crate::error::{Error, Result};
use crate::io::{MidiInput, MidiOutput};
use crate::message::MidiMessage;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

const DEFAULT_CAPACITY: usize = 32;

/// Producer side -- push messages from the device thread.
pub struct MidiQueueProducer {
    producer: HeapProd<MidiMessage>,
}

impl MidiQueueProducer {
    /// Returns `false` if the ring buffer is full.
    #[inline]
    pub fn push(&mut self, message: MidiMessage) -> bool {
        self.producer.try_push(message).is_ok()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }
}

impl MidiOutput for MidiQueueProducer {
    fn send(&mut self, message: &MidiMessage) -> Result<()> {
        if self.push(message.clone()) {
            Ok(())
        } else {
            Err(Error::QueueFull)
        }
    }
}

/// Consumer side -- drained one message per tick by the control loop.
pub struct MidiQueueConsumer {
    consumer: HeapCons<MidiMessage>,
}

impl MidiQueueConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<MidiMessage> {
        self.consumer.try_pop()
    }

    pub fn drain_all(&mut self) -> Vec<MidiMessage> {
        let mut messages = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(message) = self.consumer.try_pop() {
            messages.push(message);
        }
        messages
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

impl MidiInput for MidiQueueConsumer {
    fn poll(&mut self) -> Option<MidiMessage> {
        self.pop()
    }
}

pub fn midi_queue() -> (MidiQueueProducer, MidiQueueConsumer) {
    midi_queue_with_capacity(DEFAULT_CAPACITY)
}

pub fn midi_queue_with_capacity(capacity: usize) -> (MidiQueueProducer, MidiQueueConsumer) {
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    (MidiQueueProducer { producer }, MidiQueueConsumer { consumer })
}
