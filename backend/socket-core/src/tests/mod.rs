mod lifecycle;
mod negotiator;
mod support;
mod writer;
