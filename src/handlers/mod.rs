pub mod bookings;
pub mod health;
pub mod listings;
pub mod reviews;
pub mod users;
