//! Signatures and short descriptions of the built-in methods, shown on
//! hover and as completion details.

pub struct FunctionHelp {
    pub name: &'static str,
    pub signature: &'static str,
    pub description: &'static str,
}

const fn help(name: &'static str, signature: &'static str, description: &'static str) -> FunctionHelp {
    FunctionHelp {
        name,
        signature,
        description,
    }
}

pub const FUNCTION_HELP: &[FunctionHelp] = &[
    // sets
    help("contains", "contains(any) → bool", "Whether the set has the argument as an element"),
    help("containsAll", "containsAll(set) → bool", "Whether the set has every element of the argument set"),
    help("containsAny", "containsAny(set) → bool", "Whether the set has at least one element of the argument set"),
    // ipaddr
    help(
        "ip",
        "ip(string) → ipaddr",
        "Parses an IPv4 or IPv6 address, or a range of them in CIDR notation such as /24",
    ),
    help("isIpv4", "isIpv4() → bool", "Whether the address is an IPv4 address"),
    help("isIpv6", "isIpv6() → bool", "Whether the address is an IPv6 address"),
    help("isLoopback", "isLoopback() → bool", "Whether the address is a loopback address"),
    help("isMulticast", "isMulticast() → bool", "Whether the address is a multicast address"),
    help(
        "isInRange",
        "isInRange(ipaddr) → bool",
        "Whether the address lies within the argument range. A range receiver must be a subrange of it; a single address argument is a range of one",
    ),
    // decimal
    help(
        "decimal",
        "decimal(string) → decimal",
        "Parses a decimal value matching -?[0-9]+.[0-9]+ with at most four fractional digits",
    ),
    help("lessThan", "lessThan(decimal) → bool", "Whether the receiver is less than the argument"),
    help(
        "lessThanOrEqual",
        "lessThanOrEqual(decimal) → bool",
        "Whether the receiver is less than or equal to the argument",
    ),
    help("greaterThan", "greaterThan(decimal) → bool", "Whether the receiver is greater than the argument"),
    help(
        "greaterThanOrEqual",
        "greaterThanOrEqual(decimal) → bool",
        "Whether the receiver is greater than or equal to the argument",
    ),
];

pub fn function_help(name: &str) -> Option<&'static FunctionHelp> {
    FUNCTION_HELP.iter().find(|h| h.name == name)
}

impl FunctionHelp {
    /// The signature without the leading name, e.g. `(set) → bool`.
    pub fn detail(&self) -> &'static str {
        &self.signature[self.name.len()..]
    }
}
