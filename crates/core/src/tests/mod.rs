mod guard;
mod support;
mod timeout;
