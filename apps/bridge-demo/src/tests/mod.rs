mod logger;
mod paths;
