// Copyright (c) 2024 Linaro LTD
// SPDX-License-Identifier: Apache-2.0

// Pick up the kernel configuration: boolean settings become cfg flags, and every setting becomes
// a constant in the generated `kconfig` module.

fn main() -> anyhow::Result<()> {
    nanokernel_build::export_bool_kconfig_from("nanokernel.conf")?;
    nanokernel_build::build_kconfig_mod_from("nanokernel.conf")?;
    Ok(())
}
