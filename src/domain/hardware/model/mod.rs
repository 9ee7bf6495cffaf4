pub mod hardware_info;
