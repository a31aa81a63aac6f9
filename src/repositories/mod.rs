pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod health;
pub(crate) mod listing;
pub(crate) mod materials;
pub(crate) mod modules;
pub(crate) mod users;
