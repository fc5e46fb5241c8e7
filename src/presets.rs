use crate::entry::Preset;

/// Built-in presets used when the operator does not configure any.
pub fn default_presets() -> Vec<Preset> {
    vec![
        Preset::new(
            "vue",
            &[
                // lifecycle
                "onActivated",
                "onBeforeMount",
                "onBeforeUnmount",
                "onBeforeUpdate",
                "onErrorCaptured",
                "onDeactivated",
                "onMounted",
                "onServerPrefetch",
                "onUnmounted",
                "onUpdated",
                // setup helpers
                "useAttrs",
                "useSlots",
                // reactivity
                "computed",
                "customRef",
                "isReadonly",
                "isRef",
                "isProxy",
                "isReactive",
                "markRaw",
                "reactive",
                "readonly",
                "ref",
                "shallowReactive",
                "shallowReadonly",
                "shallowRef",
                "triggerRef",
                "toRaw",
                "toRef",
                "toRefs",
                "toValue",
                "unref",
                "watch",
                "watchEffect",
                "watchPostEffect",
                "watchSyncEffect",
                // component
                "defineComponent",
                "defineAsyncComponent",
                "getCurrentInstance",
                "h",
                "inject",
                "nextTick",
                "provide",
                "useCssModule",
                "createApp",
                // effect scope
                "effectScope",
                "EffectScope",
                "getCurrentScope",
                "onScopeDispose",
            ],
        ),
        Preset::new(
            "#app",
            &[
                "useAsyncData",
                "useLazyAsyncData",
                "useNuxtData",
                "refreshNuxtData",
                "clearNuxtData",
                "useFetch",
                "useLazyFetch",
                "useCookie",
                "useHead",
                "useSeoMeta",
                "useRequestHeaders",
                "useRequestEvent",
                "useRequestURL",
                "useState",
                "clearNuxtState",
                "useError",
                "showError",
                "clearError",
                "createError",
                "isNuxtError",
                "useNuxtApp",
                "defineNuxtPlugin",
                "defineNuxtRouteMiddleware",
                "addRouteMiddleware",
                "navigateTo",
                "abortNavigation",
                "useRuntimeConfig",
                "useAppConfig",
                "definePageMeta",
                "reloadNuxtApp",
                "callOnce",
            ],
        ),
        Preset::new(
            "vue-router",
            &["useRoute", "useRouter", "onBeforeRouteLeave", "onBeforeRouteUpdate"],
        ),
    ]
}
