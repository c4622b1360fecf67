pub mod collected_news;
pub mod consultation;
pub mod conversion_event;
pub mod faq;
pub mod news;
pub mod newsletter;
pub mod online_course;
pub mod payment;
pub mod popup;
pub mod registration;
pub mod student;
pub mod user;
