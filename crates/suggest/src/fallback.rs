//! Static fallback command lists, used to backfill suggestions while a
//! user's history is still thin. One list per remote OS family.

/// Common diagnostics for Linux-family devices.
pub const SUGGESTED_COMMANDS_LINUX: &[&str] = &[
    "ls -la",
    "ps aux",
    "df -h",
    "free -m",
    "uptime",
    "whoami",
    "id",
    "ip addr",
    "netstat -tuln",
    "docker ps",
    "systemctl status",
    "cat /etc/os-release",
    "uname -a",
    "top -b -n 1",
    "pwd",
    "env",
    "cat /proc/cpuinfo",
    "lsblk",
];

/// Common diagnostics for Windows devices.
pub const SUGGESTED_COMMANDS_WINDOWS: &[&str] = &[
    "dir",
    "tasklist",
    "systeminfo",
    "whoami",
    "ipconfig /all",
    "netstat -an",
    "ver",
    "hostname",
    "wmic cpu get name",
    "wmic logicaldisk get size,freespace,caption",
    "Get-Process",
    "Get-Service",
    "Get-EventLog -LogName System -Newest 10",
    "echo %PATH%",
    "set",
    "cd",
    "type C:\\Windows\\System32\\drivers\\etc\\hosts",
    "powershell -Command \"Get-ComputerInfo\"",
];
