// libs/appointment-cell/src/lib.rs
//! # Appointment Cell
//!
//! Scheduling for the practice: doctors book, reschedule and cancel
//! appointments with their patients, each appointment carrying a
//! deterministic video meeting link and an optional Google Calendar mirror.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Appointment Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Data structures & DTOs           |
//! |  services/      |  Business logic layer             |
//! |    booking.rs   |  Appointment service              |
//! |    conflict.rs  |  Double-booking detection         |
//! |    meeting.rs   |  Meeting link strategies          |
//! |    calendar.rs  |  Google Calendar sync             |
//! |    store.rs     |  Supabase persistence             |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /appointments` - Create appointment for the authenticated doctor
//! - `GET /appointments` - List (`patientId`, or `startDate` + `endDate`)
//! - `GET /appointments/today` - Today's appointments
//! - `GET /appointments/week` - This week's appointments (Sunday to Saturday)
//! - `GET /appointments/meeting-strategies` - Meeting link configuration
//! - `GET /appointments/google-calendar/status` - Calendar sync status
//! - `GET /appointments/{id}` - Appointment details
//! - `PATCH /appointments/{id}` - Update, re-checking conflicts on schedule changes
//! - `PATCH /appointments/{id}/status` - Overwrite status
//! - `DELETE /appointments/{id}` - Soft delete
//! - `POST /appointments/{id}/meet-link` - Get or generate the meeting link
//!
//! Calendar sync is best effort: failures are logged and never fail the request.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::appointment_routes;
pub use services::booking::AppointmentService;
