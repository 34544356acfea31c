mod logger;
mod session;
