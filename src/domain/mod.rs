pub mod page_request;
pub mod subscriber_email;
pub mod subscriber_entry;
