use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vellum_sfc::{CompileOptions, compile_template, parse_sfc};

const APP: &str = r#"<template>
  <div class="app" :class="{ dark }">
    <header>
      <h1>{{ title }}</h1>
      <slot name="actions" v-bind="actions" :busy="busy"></slot>
    </header>
    <ul>
      <li v-for="(item, i) in items" :key="item.id" @click="select(i)">
        <span v-if="item.done">done</span>
        <span v-else>{{ item.label }}</span>
      </li>
    </ul>
    <footer><p>static footer</p></footer>
  </div>
</template>
<script>
export default {}
</script>
<style scoped>
.app { color: red; }
</style>
"#;

fn bench_compile(c: &mut Criterion) {
    let sfc = parse_sfc(APP).expect("split");
    let template = sfc.template().expect("template").content.clone();

    c.bench_function("split", |b| b.iter(|| parse_sfc(black_box(APP))));
    c.bench_function("compile_template", |b| {
        let options = CompileOptions::default();
        b.iter(|| compile_template(black_box(&template), &options))
    });
    c.bench_function("compile_template_hoisted", |b| {
        let options = CompileOptions {
            hoist_static: true,
            source_map: false,
        };
        b.iter(|| compile_template(black_box(&template), &options))
    });
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
