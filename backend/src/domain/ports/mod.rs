//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod availability_policy_repository;
mod booking_command;
mod booking_event_publisher;
mod booking_query;
mod booking_repository;
mod course_catalog;
mod payment_ledger_repository;

#[cfg(test)]
pub use availability_policy_repository::MockAvailabilityPolicyRepository;
pub use availability_policy_repository::{
    AvailabilityPolicyRepository, AvailabilityPolicyRepositoryError,
};
#[cfg(test)]
pub use booking_command::MockBookingCommand;
pub use booking_command::{
    BookingActionRequest, BookingCommand, CancellationOutcome, RecordPaymentRequest,
    ReserveBookingRequest, UpdateAvailabilityPolicyRequest,
};
#[cfg(test)]
pub use booking_event_publisher::MockBookingEventPublisher;
pub use booking_event_publisher::{BookingEventPublisher, BookingEventPublisherError};
#[cfg(test)]
pub use booking_query::MockBookingQuery;
pub use booking_query::{BookingQuery, BookingView, ListTeacherBookingsRequest, PaymentLedger};
#[cfg(test)]
pub use booking_repository::MockBookingRepository;
pub use booking_repository::{
    BookingRepository, BookingRepositoryError, ReservationCommit, StatusUpdate,
};
#[cfg(test)]
pub use course_catalog::MockCourseCatalog;
pub use course_catalog::{CourseCatalog, CourseCatalogError, CourseDetails};
#[cfg(test)]
pub use payment_ledger_repository::MockPaymentLedgerRepository;
pub use payment_ledger_repository::{
    PaymentAppend, PaymentLedgerRepository, PaymentLedgerRepositoryError,
};
