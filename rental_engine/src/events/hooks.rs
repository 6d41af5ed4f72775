use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{
    BookingExpiredEvent,
    EventHandler,
    EventProducer,
    Handler,
    RentalActivatedEvent,
    RentalReturnedEvent,
    TopupCreditedEvent,
};

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub rental_activated_producer: Vec<EventProducer<RentalActivatedEvent>>,
    pub rental_returned_producer: Vec<EventProducer<RentalReturnedEvent>>,
    pub topup_credited_producer: Vec<EventProducer<TopupCreditedEvent>>,
    pub booking_expired_producer: Vec<EventProducer<BookingExpiredEvent>>,
}

impl EventProducers {
    pub async fn publish_rental_activated(&self, event: RentalActivatedEvent) {
        for emitter in &self.rental_activated_producer {
            trace!("📬️ Notifying rental activated hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_rental_returned(&self, event: RentalReturnedEvent) {
        for emitter in &self.rental_returned_producer {
            trace!("📬️ Notifying rental returned hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_topup_credited(&self, event: TopupCreditedEvent) {
        for emitter in &self.topup_credited_producer {
            trace!("📬️ Notifying top-up credited hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_booking_expired(&self, event: BookingExpiredEvent) {
        for emitter in &self.booking_expired_producer {
            trace!("📬️ Notifying booking expired hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_rental_activated: Option<EventHandler<RentalActivatedEvent>>,
    pub on_rental_returned: Option<EventHandler<RentalReturnedEvent>>,
    pub on_topup_credited: Option<EventHandler<TopupCreditedEvent>>,
    pub on_booking_expired: Option<EventHandler<BookingExpiredEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_rental_activated = hooks.on_rental_activated.map(|f| EventHandler::new(buffer_size, f));
        let on_rental_returned = hooks.on_rental_returned.map(|f| EventHandler::new(buffer_size, f));
        let on_topup_credited = hooks.on_topup_credited.map(|f| EventHandler::new(buffer_size, f));
        let on_booking_expired = hooks.on_booking_expired.map(|f| EventHandler::new(buffer_size, f));
        Self { on_rental_activated, on_rental_returned, on_topup_credited, on_booking_expired }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_rental_activated {
            result.rental_activated_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_rental_returned {
            result.rental_returned_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_topup_credited {
            result.topup_credited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_booking_expired {
            result.booking_expired_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for every configured handler. Each task ends once every producer for it has been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_rental_activated {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_rental_returned {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_topup_credited {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_booking_expired {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_rental_activated: Option<Handler<RentalActivatedEvent>>,
    pub on_rental_returned: Option<Handler<RentalReturnedEvent>>,
    pub on_topup_credited: Option<Handler<TopupCreditedEvent>>,
    pub on_booking_expired: Option<Handler<BookingExpiredEvent>>,
}

impl EventHooks {
    pub fn on_rental_activated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RentalActivatedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_rental_activated = Some(Arc::new(f));
        self
    }

    pub fn on_rental_returned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RentalReturnedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_rental_returned = Some(Arc::new(f));
        self
    }

    pub fn on_topup_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TopupCreditedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_topup_credited = Some(Arc::new(f));
        self
    }

    pub fn on_booking_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(BookingExpiredEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_booking_expired = Some(Arc::new(f));
        self
    }
}
