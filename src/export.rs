//! Export-method registry
//!
//! Client tools let an operator pick an export channel by name instead
//! of hard-coding one. The registry is a static, ordered catalogue built
//! at process start from the channels compiled into this build; the
//! first entry is the build's default channel.

/// Metadata a client needs to open one export channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportMethod {
    /// Channel name an operator selects by (`"shm"`, `"sockets"`, ...)
    pub name: &'static str,
    /// Magic pseudo-server string passed in place of a hostname to
    /// select this channel, or `None` for the plain socket transport
    pub magic: Option<&'static str>,
    /// Human-readable description for listings
    pub description: &'static str,
}

/// Ordered catalogue of export channels.
///
/// Never mutated after initialization except by tests exercising the
/// collision policy; declaration order is meaningful (the first entry is
/// the default) and is preserved by [`list`](Registry::list).
#[derive(Debug, Clone, Default)]
pub struct Registry {
    methods: Vec<ExportMethod>,
}

impl Registry {
    /// The channels compiled into this build, in declaration order
    pub fn builtin() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::default();
        #[cfg(feature = "dbus-export")]
        registry.register(ExportMethod {
            name: "dbus",
            magic: Some("dbus export"),
            description: "DBUS broadcast",
        });
        #[cfg(feature = "shm-export")]
        registry.register(ExportMethod {
            name: "shm",
            magic: Some("shared memory"),
            description: "shared memory",
        });
        #[cfg(feature = "sockets-export")]
        registry.register(ExportMethod {
            name: "sockets",
            magic: None,
            description: "JSON via sockets",
        });
        registry
    }

    /// Append a descriptor to the catalogue
    pub fn register(&mut self, method: ExportMethod) {
        self.methods.push(method);
    }

    /// Look up a channel by name.
    ///
    /// Linear scan; when names collide the last matching entry wins.
    /// This mirrors an iterate-and-overwrite selection policy that
    /// existing configurations rely on, so it must be preserved.
    pub fn lookup(&self, name: &str) -> Option<&ExportMethod> {
        let mut found = None;
        for method in &self.methods {
            if method.name == name {
                found = Some(method);
            }
        }
        found
    }

    /// All known channels, in declaration order (not sorted: display
    /// order communicates which entry is the default)
    pub fn list(&self) -> &[ExportMethod] {
        &self.methods
    }

    /// The build's default channel: the first entry, or `None` for a
    /// build with no export channels compiled in (valid, must not crash
    /// callers)
    pub fn default_method(&self) -> Option<&ExportMethod> {
        self.methods.first()
    }
}
