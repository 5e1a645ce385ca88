// TODO: look up open descriptors with lsof or libproc
pub fn is_port_open(_port_name: &str) -> bool {
    false
}
