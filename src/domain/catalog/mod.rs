pub mod known_service;
