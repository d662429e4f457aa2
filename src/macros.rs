macro_rules! dispatch_arch {
    ($type:ident: $arch:expr => $expr:expr) => {{
        use crate::arch::{Aarch64, Arch, X86_64};

        match $arch {
            Arch::Aarch64 => {
                type $type = Aarch64;
                $expr
            }

            Arch::X86_64 => {
                type $type = X86_64;
                $expr
            }
        }
    }};
}

macro_rules! emit {
    ($context:expr, $opcode:expr) => {
        $context.push(format!("\t{}", $opcode))
    };

    ($context:expr, $opcode:expr, $($format:tt)*) => {
        $context.push(format!("\t{:8}{}", $opcode, format_args!($($format)*)))
    };
}
