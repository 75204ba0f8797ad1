// Communication channels lock-free
//
// Every channel is a bounded SPSC ringbuffer. Producers use `try_push` and
// drop on overflow: nothing on the scheduling or audio path ever blocks.

use crate::messaging::command::ControlCommand;
use crate::messaging::display::DisplayEvent;
use crate::messaging::notification::Notification;
use crate::synth::click::ClickRequest;
use ringbuf::{HeapRb, traits::Split};

/// Input thread -> scheduling loop
pub type ControlProducer = ringbuf::HeapProd<ControlCommand>;
pub type ControlConsumer = ringbuf::HeapCons<ControlCommand>;

pub fn create_control_channel(capacity: usize) -> (ControlProducer, ControlConsumer) {
    let rb = HeapRb::<ControlCommand>::new(capacity);
    rb.split()
}

/// Scheduling loop -> audio callback
pub type ClickProducer = ringbuf::HeapProd<ClickRequest>;
pub type ClickConsumer = ringbuf::HeapCons<ClickRequest>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ClickRequest>::new(capacity);
    rb.split()
}

/// Scheduler -> display layer
pub type DisplayProducer = ringbuf::HeapProd<DisplayEvent>;
pub type DisplayConsumer = ringbuf::HeapCons<DisplayEvent>;

pub fn create_display_channel(capacity: usize) -> (DisplayProducer, DisplayConsumer) {
    let rb = HeapRb::<DisplayEvent>::new(capacity);
    rb.split()
}

/// Audio error callback -> UI
pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}
