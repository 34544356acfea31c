mod helpers;
mod lifecycle;
mod negotiator;
mod stream;
