//! Outgoing multicast interface selection (§4.6).
//!
//! Policy: `MCAST_IFACE` override, else first non-loopback interface with an
//! IPv4, else "no interface" (callers skip the `IP_MULTICAST_IF` bind and let
//! the OS default route decide).

use std::net::Ipv4Addr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedIface {
    pub name: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
}

pub fn pick_multicast_iface(forced_name: Option<&str>) -> SelectedIface {
    if let Some(name) = forced_name {
        return SelectedIface {
            ipv4: iface_ipv4(name),
            name: Some(name.to_string()),
        };
    }

    for name in list_ifaces() {
        if name == "lo" {
            continue;
        }
        if let Some(ip) = iface_ipv4(&name) {
            return SelectedIface { name: Some(name), ipv4: Some(ip) };
        }
    }

    SelectedIface::default()
}

#[cfg(unix)]
fn list_ifaces() -> Vec<String> {
    use std::ffi::CStr;

    let mut names = Vec::new();
    unsafe {
        let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut addrs) != 0 {
            return names;
        }
        let mut cur = addrs;
        while !cur.is_null() {
            let entry = &*cur;
            if !entry.ifa_name.is_null() {
                let name = CStr::from_ptr(entry.ifa_name).to_string_lossy().into_owned();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            cur = entry.ifa_next;
        }
        libc::freeifaddrs(addrs);
    }
    names
}

#[cfg(unix)]
fn iface_ipv4(name: &str) -> Option<Ipv4Addr> {
    use std::ffi::CStr;

    unsafe {
        let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut addrs) != 0 {
            return None;
        }
        let mut cur = addrs;
        let mut found = None;
        while !cur.is_null() {
            let entry = &*cur;
            if !entry.ifa_name.is_null() && !entry.ifa_addr.is_null() {
                let ifname = CStr::from_ptr(entry.ifa_name).to_string_lossy();
                if ifname == name && (*entry.ifa_addr).sa_family as i32 == libc::AF_INET {
                    let sockaddr_in = entry.ifa_addr as *const libc::sockaddr_in;
                    let ip = u32::from_be((*sockaddr_in).sin_addr.s_addr);
                    found = Some(Ipv4Addr::from(ip));
                    break;
                }
            }
            cur = entry.ifa_next;
        }
        libc::freeifaddrs(addrs);
        found
    }
}

#[cfg(not(unix))]
fn list_ifaces() -> Vec<String> {
    Vec::new()
}

#[cfg(not(unix))]
fn iface_ipv4(_name: &str) -> Option<Ipv4Addr> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_unknown_iface_yields_no_ipv4_but_keeps_name() {
        let picked = pick_multicast_iface(Some("definitely-not-a-real-iface-xyz"));
        assert_eq!(picked.name.as_deref(), Some("definitely-not-a-real-iface-xyz"));
        assert_eq!(picked.ipv4, None);
    }

    #[test]
    fn auto_pick_never_selects_loopback() {
        let picked = pick_multicast_iface(None);
        assert_ne!(picked.name.as_deref(), Some("lo"));
    }
}
